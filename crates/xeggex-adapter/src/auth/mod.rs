/*
[INPUT]:  Settings file and API key pair
[OUTPUT]: Credentials and keyed HMAC signer
[POS]:    Auth layer - handles XeggeX API key material
[UPDATE]: When credential sources or signature methods change
*/

pub mod credentials;
pub mod signer;

pub use credentials::{Credentials, DEFAULT_SETTINGS_FILE};
pub use signer::HmacSigner;
