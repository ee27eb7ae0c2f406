//! Mapping from provider emotion labels to situation-text enrichment words.
//!
//! The generation model was trained on Korean situation strings, so the
//! provider's English labels are translated before being appended. Labels
//! without a mapping pass through unchanged rather than being dropped.

pub fn map_emotion(label: &str) -> &str {
    match label {
        "Admiration" => "감탄",
        "Amusement" => "즐거움",
        "Anger" => "분노",
        "Anxiety" => "불안함",
        "Boredom" => "지루함",
        "Calmness" => "평온함",
        "Concentration" => "집중",
        "Confusion" => "혼란스러움",
        "Contentment" => "만족함",
        "Disappointment" => "실망함",
        "Disgust" => "불쾌함",
        "Distress" => "괴로움",
        "Excitement" => "신남",
        "Fear" => "두려움",
        "Interest" => "흥미로움",
        "Joy" => "기쁨",
        "Love" => "사랑스러움",
        "Sadness" => "슬픔",
        "Satisfaction" => "뿌듯함",
        "Surprise (negative)" => "놀람",
        "Surprise (positive)" => "놀람",
        "Tiredness" => "피곤함",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_labels_map_to_korean() {
        assert_eq!(map_emotion("Joy"), "기쁨");
        assert_eq!(map_emotion("Tiredness"), "피곤함");
        assert_eq!(map_emotion("Surprise (positive)"), "놀람");
    }

    #[test]
    fn test_unknown_labels_pass_through() {
        assert_eq!(map_emotion("Nostalgia"), "Nostalgia");
    }
}
