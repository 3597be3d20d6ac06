use std::sync::Arc;

use crate::admission::TaskAdmission;
use crate::billing::BillingLedger;
use crate::config::settings::AppSettings;
use crate::dispatcher::Dispatcher;
use crate::storage::Storage;

/// Shared application state injected into every handler via `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub admission: Arc<TaskAdmission>,
    pub dispatcher: Arc<dyn Dispatcher>,
    pub billing: Arc<BillingLedger>,
    pub settings: Arc<AppSettings>,
}
