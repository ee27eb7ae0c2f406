//! Static appliance catalog.
//!
//! The registry of controllable appliances: stable ids, canonical display
//! names, and the recommended state vocabulary that the interpreter prompt
//! embeds. Fixed at compile time and shared read-only across the process.

/// Canonical state assigned to every appliance that is turned off.
///
/// Kept in the source locale ("standby"), consistent with the rest of the
/// catalog vocabulary.
pub const STANDBY_STATE: &str = "대기";

/// A controllable appliance known to the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Device {
    /// Stable catalog id. Never reused.
    pub id: u32,

    /// Canonical display name.
    pub name: &'static str,

    /// Suggested state strings for this appliance. Not exhaustive: free-form
    /// state text is accepted when none of these fit.
    pub recommended_states: &'static [&'static str],
}

static DEVICES: &[Device] = &[
    Device {
        id: 1,
        name: "에어컨",
        recommended_states: &[
            "{temperature}°C",
            "냉방 모드",
            "제습 모드",
            "송풍 모드",
            "자동 모드",
            "파워 바람",
            "취침 모드",
        ],
    },
    Device {
        id: 2,
        name: "공기청정기",
        recommended_states: &["무풍", "약풍", "중풍", "강풍"],
    },
    Device {
        id: 3,
        name: "로봇청소기",
        recommended_states: &["청소 모드", "충전 모드", "청소 완료", "빠른 청소"],
    },
    Device {
        id: 4,
        name: "TV",
        recommended_states: &["음악 재생", "영화 모드"],
    },
    Device {
        id: 5,
        name: "조명",
        recommended_states: &["밝게", "어둡게"],
    },
    Device {
        id: 6,
        name: "정수기",
        recommended_states: &["냉수 준비", "온수 준비"],
    },
    Device {
        id: 7,
        name: "세탁기",
        recommended_states: &[
            "표준 세탁",
            "급속 세탁",
            "섬세 세탁",
            "세탁 완료",
            "탈수 중",
            "헹굼 중",
        ],
    },
    Device {
        id: 8,
        name: "건조기",
        recommended_states: &["표준 건조", "강력 건조", "섬세 건조", "건조 완료"],
    },
    Device {
        id: 9,
        name: "식기세척기",
        recommended_states: &["살균 건조", "강력", "일반", "세척 완료"],
    },
    Device {
        id: 10,
        name: "스타일러",
        recommended_states: &[
            "표준 스타일링",
            "급속 스타일링",
            "강력 스타일링",
            "위생살균 모드",
            "관리 완료",
        ],
    },
];

/// All catalog devices, in id order.
pub fn all() -> &'static [Device] {
    DEVICES
}

/// Look up a device by its catalog id.
///
/// `None` means the device is not in the catalog; callers treat that as
/// "device not mentioned" and ignore it.
pub fn get(id: u32) -> Option<&'static Device> {
    DEVICES.iter().find(|d| d.id == id)
}

/// Look up a device by its canonical display name.
pub fn find_by_name(name: &str) -> Option<&'static Device> {
    DEVICES.iter().find(|d| d.name == name)
}
