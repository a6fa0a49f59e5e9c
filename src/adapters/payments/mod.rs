//! Payment provider adapters.

mod stub_retrier;

pub use stub_retrier::StubPaymentRetrier;
