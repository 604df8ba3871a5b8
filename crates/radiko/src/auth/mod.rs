//! Device identity and credential management.

pub mod area;
pub mod device;
pub mod handshake;
pub mod manager;
pub mod partial_key;

pub use area::{AREAS, Area, FALLBACK_AREA, area_or_fallback, find_area, is_known_area};
pub use device::{ANDROID_BUILDS, AndroidBuild, DeviceIdentity, RADIKO_APP_VERSION};
pub use handshake::{Authenticator, HttpAuthenticator, Issued};
pub use manager::{Credential, CredentialManager};
pub use partial_key::derive_partial_key;
