use std::{net::IpAddr, sync::Arc};

use vhadmin_lgsm::Prober;

use crate::{config::Config, outcomes::OutcomeLog};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Address the query helper is pointed at.
    pub public_ip: IpAddr,
    pub prober: Arc<Prober>,
    pub outcomes: OutcomeLog,
}

impl AppState {
    pub fn new(config: Config, public_ip: IpAddr) -> Self {
        let prober = Prober::new(
            config.probe_program.clone(),
            config.probe_script.clone(),
            config.probe_protocol.clone(),
            config.probe_timeout,
        );
        let outcomes = OutcomeLog::new(config.outcome_history);
        Self {
            config: Arc::new(config),
            public_ip,
            prober: Arc::new(prober),
            outcomes,
        }
    }
}
