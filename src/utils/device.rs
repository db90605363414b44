use serde::{Deserialize, Serialize};

const MOBILE_KEYWORDS: &[&str] = &[
    "android",
    "iphone",
    "ipad",
    "ipod",
    "windows phone",
    "mobile",
    "blackberry",
    "bb",
    "opera mini",
    "fennec",
    "kindle",
    "silk",
    "playbook",
    "nexus",
    "galaxy",
    "palm",
];

const TABLET_KEYWORDS: &[&str] = &["ipad", "playbook", "kindle", "silk", "tablet", "nexus"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Desktop,
    Mobile,
    Tablet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_type: DeviceType,
    pub name: String,
}

impl DeviceInfo {
    /// Phones and tablets get the touch layout and smaller boards.
    pub fn is_mobile_class(&self) -> bool {
        matches!(self.device_type, DeviceType::Mobile | DeviceType::Tablet)
    }
}

/// Classifies a `User-Agent` header. Tablet keywords win over phone keywords.
pub fn detect_device(user_agent: &str) -> DeviceInfo {
    if user_agent.trim().is_empty() {
        return DeviceInfo {
            device_type: DeviceType::Desktop,
            name: "Unknown Desktop".to_string(),
        };
    }

    let lower = user_agent.to_lowercase();
    let device_type = if TABLET_KEYWORDS.iter().any(|k| lower.contains(k)) {
        DeviceType::Tablet
    } else if MOBILE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        DeviceType::Mobile
    } else {
        DeviceType::Desktop
    };

    DeviceInfo {
        device_type,
        name: device_name(&lower),
    }
}

fn device_name(lower: &str) -> String {
    if lower.contains("iphone") {
        "iPhone".to_string()
    } else if lower.contains("ipad") {
        "iPad".to_string()
    } else if lower.contains("android") {
        let version = android_version(lower);
        match android_model(lower) {
            Some(model) => format!("Android {version} ({model})"),
            None => format!("Android {version}"),
        }
    } else if lower.contains("windows phone") {
        "Windows Phone".to_string()
    } else if lower.contains("kindle") {
        "Kindle".to_string()
    } else if lower.contains("chrome") {
        "Chrome".to_string()
    } else if lower.contains("firefox") {
        "Firefox".to_string()
    } else if lower.contains("safari") {
        "Safari".to_string()
    } else if lower.contains("edge") {
        "Edge".to_string()
    } else {
        "Unknown".to_string()
    }
}

/// Version digits after the first "android" that is followed by whitespace.
fn android_version(lower: &str) -> &str {
    lower
        .match_indices("android")
        .find_map(|(start, keyword)| {
            let after = &lower[start + keyword.len()..];
            let rest = after.trim_start();
            if rest.len() == after.len() {
                return None;
            }
            let end = rest
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .unwrap_or(rest.len());
            (end > 0).then(|| &rest[..end])
        })
        .unwrap_or("")
}

// The model sits between the last ';' and "build/", e.g. "; sm-g960f build/".
fn android_model(lower: &str) -> Option<&str> {
    let head = &lower[..lower.find("build/")?];
    let model = head[head.rfind(';')? + 1..].trim();
    if model.is_empty() || model.contains(')') {
        None
    } else {
        Some(model)
    }
}
