use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use log::info;
use md5::{Digest, Md5};
use rand::RngCore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OtpPurpose {
    SignUp,
}

impl OtpPurpose {
    fn as_str(self) -> &'static str {
        match self {
            Self::SignUp => "SignUp",
        }
    }
}

/// Per-user salt the codes are derived from.
pub fn new_key() -> String {
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

/// Issues the code for the current window. Delivery is stubbed: the code is
/// logged and handed back to the caller.
pub fn generate(key: &str, user_id: i32, purpose: OtpPurpose, interval_seconds: i64) -> u32 {
    let code = code_for_window(key, purpose, current_window(interval_seconds));
    info!("otp issued user_id={} purpose={} code={:06}", user_id, purpose.as_str(), code);
    code
}

/// Accepts the code of the current window or the one just before it.
pub fn verify(key: &str, purpose: OtpPurpose, code: u32, interval_seconds: i64) -> bool {
    let window = current_window(interval_seconds);
    [window, window - 1]
        .iter()
        .any(|w| code_for_window(key, purpose, *w) == code)
}

fn current_window(interval_seconds: i64) -> i64 {
    Utc::now().timestamp() / interval_seconds.max(1)
}

fn code_for_window(key: &str, purpose: OtpPurpose, window: i64) -> u32 {
    let mut hasher = Md5::new();
    hasher.update(key.as_bytes());
    hasher.update(b":");
    hasher.update(purpose.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(window.to_be_bytes());
    let digest = hasher.finalize();
    let n = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) & 0x7fff_ffff;
    n % 1_000_000
}
