//! 终端子系统
//!
//! ```text
//! checkout ──initiate──► PaymentSessionManager ──► Dispatcher ──► ConnectionRegistry ──► device
//!                                 ▲                                                    │
//!                                 └──────── payment.result / HTTP polling ◄────────────┘
//! admin ──► TerminalService / PairingManager ──► SQLite (terminal, pairing_code)
//! ```

pub mod dispatch;
pub mod error;
pub mod ids;
pub mod pairing;
pub mod registry;
pub mod sessions;
pub mod store;

pub use dispatch::Dispatcher;
pub use error::{Entity, TerminalError, TerminalResult};
pub use ids::IdGenerator;
pub use pairing::{PairingManager, PairingResult};
pub use registry::{Connection, ConnectionRegistry};
pub use sessions::{PaymentSessionManager, expired_at};
pub use store::TerminalService;
