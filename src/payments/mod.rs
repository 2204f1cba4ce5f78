//! Payment gateway integration: order creation and callback authentication.

pub mod error;
pub mod provider;
pub mod signature;
pub mod types;
pub mod upay;
pub mod utils;

pub use error::{PaymentError, PaymentResult};
pub use provider::PaymentGateway;
pub use types::{CallbackPayload, CreateOrderRequest, PaymentOrder};
pub use upay::{generate_order_id, UpayGateway, SIGNATURE_HEADER};
