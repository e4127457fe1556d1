//! Telephony Adapters for Dialflow
//!
//! Concrete implementations of [`dialflow::TelephonyPort`]: a global
//! provider (Twilio), a regional provider (Exotel) and a null adapter for
//! dry runs. Number normalization, vendor authentication and callback
//! payload shapes stay inside this crate.
//!
//! # Usage
//!
//! ```rust,ignore
//! use dialflow_telephony::{TwilioAdapter, TwilioConfig};
//!
//! let config = TwilioConfig::new("ACxxxx", "token", "+14155550100")
//!     .with_callback_base("https://dialflow.example.com");
//! let telephony = TwilioAdapter::new(config)?;
//! ```

mod config;
mod error;
mod exotel;
mod normalize;
mod null;
mod twilio;
mod webhook;

pub use config::{ExotelConfig, TwilioConfig};
pub use error::TelephonyError;
pub use exotel::ExotelAdapter;
pub use normalize::{normalize_phone, to_national};
pub use null::NullTelephony;
pub use twilio::{render_twiml, TwilioAdapter};
pub use webhook::{speech_text, translate_status, Provider};
