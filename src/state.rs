use std::path::PathBuf;
use std::sync::Arc;

use crate::payment::PaymentGateway;
use crate::session::SessionKeys;
use crate::settlement::Settlement;
use crate::shipping::ShippingProvider;
use crate::store::Store;

/// Process-wide handles, built once in `main` and shared with every worker.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub payments: Option<Arc<dyn PaymentGateway>>,
    pub shipping: Option<Arc<dyn ShippingProvider>>,
    pub webhook_secret: Option<String>,
    pub sessions: SessionKeys,
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn settlement(&self) -> Settlement<'_> {
        Settlement {
            store: self.store.as_ref(),
            gateway: self.payments.as_deref(),
            shipping: self.shipping.as_deref(),
        }
    }
}
