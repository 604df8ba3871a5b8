use rand::{Rng, rng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};

/// Client version announced in `X-Radiko-App-Version` and the user agent.
pub const RADIKO_APP_VERSION: &str = "8.1.11";

/// An Android release the spoofed client claims to run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AndroidBuild {
    pub release: &'static str,
    pub sdk: u32,
    pub build: &'static str,
}

pub const ANDROID_BUILDS: &[AndroidBuild] = &[
    AndroidBuild { release: "7.0.0", sdk: 24, build: "NRD90M" },
    AndroidBuild { release: "7.1.2", sdk: 25, build: "N2G47H" },
    AndroidBuild { release: "8.0.0", sdk: 26, build: "OPR6.170623.013" },
    AndroidBuild { release: "8.1.0", sdk: 27, build: "OPM1.171019.011" },
    AndroidBuild { release: "9.0.0", sdk: 28, build: "PQ3A.190801.002" },
    AndroidBuild { release: "10.0.0", sdk: 29, build: "QQ3A.200805.001" },
    AndroidBuild { release: "11.0.0", sdk: 30, build: "RQ3A.211001.001" },
    AndroidBuild { release: "12.0.0", sdk: 31, build: "SQ1A.220205.002" },
    AndroidBuild { release: "13.0.0", sdk: 33, build: "TQ3A.230805.001" },
    AndroidBuild { release: "14.0.0", sdk: 34, build: "UQ1A.240205.004" },
];

/// Spoofed client fingerprint, generated once and reused for every session.
///
/// Serialized with the field names the browser host already persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceIdentity {
    pub user_id: String,
    pub app_version: String,
    pub device: String,
    pub user_agent: String,
}

impl DeviceIdentity {
    /// Derives an identity from a fixed user id and build.
    pub fn from_build(user_id: impl Into<String>, build: &AndroidBuild) -> Self {
        Self {
            user_id: user_id.into(),
            app_version: RADIKO_APP_VERSION.to_string(),
            device: format!("{}_{}", build.sdk, build.build),
            user_agent: format!(
                "radiko/{} (Android; {}; {})",
                RADIKO_APP_VERSION, build.release, build.build
            ),
        }
    }

    /// Picks a random build and a fresh 16-hex-digit user id.
    pub fn generate() -> Self {
        let mut rng = rng();
        let build = ANDROID_BUILDS.choose(&mut rng).unwrap_or(&ANDROID_BUILDS[0]);
        Self::from_build(generate_user_id(&mut rng), build)
    }
}

fn generate_user_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    const HEX: &[u8] = b"0123456789abcdef";
    (0..16)
        .map(|_| HEX[rng.random_range(0..HEX.len())] as char)
        .collect()
}
