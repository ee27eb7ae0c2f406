//! End-to-end tests of the parsing pipeline and recommend flow against
//! mock collaborators.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use routined::catalog::STANDBY_STATE;
use routined::generate::GenerateError;
use routined::generate::RecommendError;
use routined::generate::RecommendFlow;
use routined::generate::RoutineGenerator;
use routined::routine::LanguageModel;
use routined::routine::LanguageModelError;
use routined::routine::OnOff;
use routined::routine::ParseFailure;
use routined::routine::Policy;
use routined::routine::RoutinePipeline;

/// Language model that always replies with the same text.
struct FixedModel(String);

#[async_trait]
impl LanguageModel for FixedModel {
    async fn complete(&self, _prompt: &str) -> Result<String, LanguageModelError> {
        Ok(self.0.clone())
    }
}

fn pipeline(reply: &str) -> RoutinePipeline {
    RoutinePipeline::new(Arc::new(FixedModel(reply.to_string())), Policy::Lenient)
}

/// Generator that replays a scripted sequence of sentences.
struct ScriptedGenerator {
    replies: Mutex<Vec<String>>,
    calls: Mutex<u32>,
}

impl ScriptedGenerator {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl RoutineGenerator for ScriptedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerateError> {
        *self.calls.lock().unwrap() += 1;
        let mut replies = self.replies.lock().unwrap();
        if replies.len() > 1 {
            Ok(replies.remove(0))
        } else {
            Ok(replies[0].clone())
        }
    }
}

#[tokio::test]
async fn parse_turns_off_entries_into_standby() {
    let reply = r#"{"updates": [
        {"appliance_id": 1, "user_id": 6, "name": "에어컨", "onoff": "ON",
         "state": "26도", "is_active": "True"},
        {"appliance_id": 4, "user_id": 6, "name": "TV", "onoff": "OFF",
         "state": "영화 모드", "is_active": "True"}
    ]}"#;

    let result = pipeline(reply)
        .parse("에어컨을 26도로 설정하고 TV를 끌게요.")
        .await
        .unwrap();

    assert_eq!(result.routine, "에어컨을 26도로 설정하고 TV를 끌게요.");
    assert_eq!(result.updates.len(), 2);

    let aircon = &result.updates[0];
    assert_eq!(aircon.appliance_id, 1);
    assert_eq!(aircon.onoff, OnOff::On);
    assert_eq!(aircon.state, "26도");
    assert!(aircon.is_active);

    let tv = &result.updates[1];
    assert_eq!(tv.appliance_id, 4);
    assert_eq!(tv.onoff, OnOff::Off);
    assert_eq!(tv.state, STANDBY_STATE);
    assert!(!tv.is_active);
}

#[tokio::test]
async fn parse_deduplicates_repeated_appliance() {
    let reply = r#"{"updates": [
        {"appliance_id": 2, "user_id": 6, "name": "공기청정기", "onoff": "ON",
         "state": "약풍", "is_active": true},
        {"appliance_id": 2, "user_id": 6, "name": "공기청정기", "onoff": "ON",
         "state": "강풍", "is_active": true}
    ]}"#;

    let result = pipeline(reply).parse("공기청정기를 켜줘").await.unwrap();
    assert_eq!(result.updates.len(), 1);
    assert_eq!(result.updates[0].appliance_id, 2);
    assert_eq!(result.updates[0].state, "강풍");
}

#[tokio::test]
async fn parse_rejects_payload_without_updates_key() {
    let err = pipeline(r#"{"routine": "TV를 끌게요"}"#)
        .parse("TV 꺼줘")
        .await
        .unwrap_err();
    assert!(matches!(err, ParseFailure::MalformedOutput(_)));
}

#[tokio::test]
async fn parse_drops_unknown_appliance_without_failing() {
    let reply = r#"{"updates": [
        {"appliance_id": 999, "user_id": 6, "name": "커튼", "onoff": "ON",
         "state": "열기", "is_active": true},
        {"appliance_id": 5, "user_id": 6, "name": "조명", "onoff": "ON",
         "state": "어둡게", "is_active": true}
    ]}"#;

    let result = pipeline(reply).parse("조명 어둡게 해줘").await.unwrap();
    assert_eq!(result.updates.len(), 1);
    assert_eq!(result.updates[0].appliance_id, 5);
}

const VALID_MODEL_REPLY: &str = r#"{"updates": [
    {"appliance_id": 1, "user_id": 6, "name": "에어컨", "onoff": "ON",
     "state": "26도", "is_active": true}
]}"#;

#[tokio::test]
async fn recommend_parses_generated_routine() {
    let generator = ScriptedGenerator::new(&["에어컨을 26도로 설정할게요."]);
    let flow = RecommendFlow::new(generator.clone(), pipeline(VALID_MODEL_REPLY), 16, 3);

    let result = flow.recommend("너무 더워").await.unwrap();
    assert_eq!(result.routine, "에어컨을 26도로 설정할게요.");
    assert_eq!(result.updates.len(), 1);
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn recommend_regenerates_when_generator_repeats_itself() {
    let generator = ScriptedGenerator::new(&[
        "에어컨을 26도로 설정할게요.",
        "에어컨을 26도로 설정할게요.",
        "에어컨을 24도로 설정할게요.",
    ]);
    let flow = RecommendFlow::new(generator.clone(), pipeline(VALID_MODEL_REPLY), 16, 3);

    let first = flow.recommend("너무 더워").await.unwrap();
    assert_eq!(first.routine, "에어컨을 26도로 설정할게요.");

    // Same situation again: the generator's repeat is rejected once and a
    // fresh sentence is accepted.
    let second = flow.recommend("너무 더워").await.unwrap();
    assert_eq!(second.routine, "에어컨을 24도로 설정할게요.");
    assert_eq!(generator.calls(), 3);
}

#[tokio::test]
async fn recommend_accepts_repeat_after_bounded_attempts() {
    let generator = ScriptedGenerator::new(&["에어컨을 26도로 설정할게요."]);
    let flow = RecommendFlow::new(generator.clone(), pipeline(VALID_MODEL_REPLY), 16, 3);

    flow.recommend("너무 더워").await.unwrap();
    let second = flow.recommend("너무 더워").await.unwrap();

    // The generator only ever produces one sentence; after the attempt
    // bound the repeat is accepted instead of looping forever.
    assert_eq!(second.routine, "에어컨을 26도로 설정할게요.");
    assert_eq!(generator.calls(), 4);
}

#[tokio::test]
async fn recommend_propagates_parse_failures() {
    let generator = ScriptedGenerator::new(&["에어컨을 26도로 설정할게요."]);
    let flow = RecommendFlow::new(generator, pipeline("not json at all"), 16, 3);

    let err = flow.recommend("너무 더워").await.unwrap_err();
    assert!(matches!(
        err,
        RecommendError::Parse(ParseFailure::MalformedOutput(_))
    ));
}
