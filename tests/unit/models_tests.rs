/*!
 * Tests for backend wire models
 */

use serde_json::json;

use blogflow::backend::models::{
    ContentRequest, ContentSummary, ImageGenerationRequest, ImageRecord, Keyword, KeywordDetail, ResearchStats,
    SavedTitle, TitleGenerationAck, dedupe_images, normalize_list, parse_title_set,
};
use blogflow::errors::BackendError;

fn image(url: Option<&str>, legacy: Option<&str>) -> ImageRecord {
    ImageRecord {
        url: url.map(str::to_string),
        image: legacy.map(str::to_string),
        ..ImageRecord::default()
    }
}

#[test]
fn test_normalize_list_withBareArrayOrEnvelope_shouldYieldItems() {
    let bare: Vec<Keyword> = normalize_list(json!([{"id": 1, "keyword": "캠핑"}])).unwrap();
    let wrapped: Vec<Keyword> = normalize_list(json!({"results": [{"id": "1", "keyword": "캠핑"}], "count": 1})).unwrap();

    assert_eq!(bare, wrapped);
    assert_eq!(bare[0].id, "1");
}

#[test]
fn test_normalize_list_withOtherShapes_shouldYieldEmpty() {
    for body in [json!(null), json!({"detail": "none"}), json!({"results": null}), json!("text")] {
        let items: Vec<Keyword> = normalize_list(body).unwrap();
        assert!(items.is_empty());
    }
}

#[test]
fn test_normalize_list_withMalformedElement_shouldFailWithParseError() {
    let result: Result<Vec<Keyword>, _> = normalize_list(json!([{"id": 1}]));
    assert!(matches!(result, Err(BackendError::ParseError(_))));
}

#[test]
fn test_keyword_is_analyzed_shouldRequireNonEmptyIntent() {
    let parse = |intent| serde_json::from_value::<Keyword>(json!({"id": 1, "keyword": "k", "main_intent": intent})).unwrap();

    assert!(parse(json!("정보형")).is_analyzed());
    assert!(parse(json!({"type": "commercial"})).is_analyzed());
    assert!(!parse(json!("")).is_analyzed());
    assert!(!parse(json!(null)).is_analyzed());
    assert!(!parse(json!(false)).is_analyzed());
    assert!(!parse(json!(0)).is_analyzed());
    assert!(!parse(json!(0.0)).is_analyzed());
    assert!(parse(json!(true)).is_analyzed());
    assert!(parse(json!(2)).is_analyzed());
    assert!(parse(json!([])).is_analyzed());
}

#[test]
fn test_keyword_detail_withMixedSubtopicForms_shouldExposeTitles() {
    let detail: KeywordDetail = serde_json::from_value(json!({
        "id": 5,
        "keyword": "캠핑",
        "subtopics": ["장비 고르기", {"title": "캠핑장 예약"}]
    }))
    .unwrap();

    let titles: Vec<&str> = detail.subtopics.iter().map(|s| s.title()).collect();
    assert_eq!(titles, vec!["장비 고르기", "캠핑장 예약"]);
}

#[test]
fn test_content_summary_accessors_shouldHandleLooseShapes() {
    let embedded: ContentSummary = serde_json::from_value(json!({
        "id": 11,
        "keyword": {"id": 2, "keyword": "캠핑"},
        "created_at": "2024-03-01T09:00:00+09:00"
    }))
    .unwrap();

    assert_eq!(embedded.id, "11");
    assert_eq!(embedded.keyword_text(), Some("캠핑"));
    assert_eq!(embedded.display_title(), "(untitled)");
    assert!(embedded.created_at().is_some());

    let bad_date = ContentSummary {
        created_at: Some("yesterday".into()),
        ..embedded
    };
    assert!(bad_date.created_at().is_none());
}

#[test]
fn test_research_stats_withMissingCounts_shouldDefaultToZero() {
    let stats: ResearchStats = serde_json::from_value(json!({"news_count": 4, "academic_count": 2})).unwrap();
    assert_eq!(stats.general_count, 0);
    assert_eq!(stats.total(), 6);
}

#[test]
fn test_research_stats_total_withHugeCounts_shouldSaturate() {
    let stats = ResearchStats {
        news_count: u32::MAX,
        academic_count: 5,
        general_count: 1,
        statistics_count: 0,
    };
    assert_eq!(stats.total(), u32::MAX);
}

#[test]
fn test_split_morphemes_shouldSplitOnWhitespace() {
    assert_eq!(
        ContentRequest::split_morphemes("자동차 수리 점검"),
        vec!["자동차".to_string(), "수리".to_string(), "점검".to_string()]
    );
    assert_eq!(ContentRequest::split_morphemes("  텐트\t타프\n  버너 "), vec!["텐트", "타프", "버너"]);
    assert!(ContentRequest::split_morphemes("  ").is_empty());
}

#[test]
fn test_parse_title_set_withAllSuggestionForms_shouldNormalize() {
    let titles = parse_title_set(json!({
        "question": [{"suggestion": "캠핑 처음이라면?"}, {"title": "무엇을 챙길까?"}],
        "list": ["필수 준비물 7가지"]
    }))
    .unwrap();

    let keys: Vec<&String> = titles.keys().collect();
    assert_eq!(keys, vec!["list", "question"]);
    assert_eq!(titles["question"][1].suggestion, "무엇을 챙길까?");
    assert_eq!(titles["list"][0].suggestion, "필수 준비물 7가지");
}

#[test]
fn test_parse_title_set_withWrongShape_shouldFail() {
    assert!(matches!(parse_title_set(json!(["a", "b"])), Err(BackendError::ParseError(_))));
}

#[test]
fn test_title_ack_needs_polling_shouldDetectBackgroundWork() {
    let ack = |value| serde_json::from_value::<TitleGenerationAck>(value).unwrap();

    assert!(ack(json!({"status": "processing"})).needs_polling());
    assert!(ack(json!({"message": "제목 생성이 백그라운드에서 진행 중입니다"})).needs_polling());
    assert!(ack(json!({"message": "Running in Background"})).needs_polling());
    assert!(!ack(json!({"status": "success", "data": {}})).needs_polling());
    assert!(!TitleGenerationAck::default().needs_polling());
}

#[test]
fn test_saved_title_shouldAcceptNumericIds() {
    let saved: SavedTitle = serde_json::from_value(json!({"id": 3, "content_id": 9, "title": "t"})).unwrap();
    assert_eq!(saved.id.as_deref(), Some("3"));
    assert_eq!(saved.content_id.as_deref(), Some("9"));
}

#[test]
fn test_image_record_source_shouldPreferUrl() {
    assert_eq!(image(Some("/a.png"), Some("/b.png")).source(), Some("/a.png"));
    assert_eq!(image(None, Some("/b.png")).source(), Some("/b.png"));
    assert_eq!(image(None, None).source(), None);
    assert!(!image(None, None).is_infographic());
}

#[test]
fn test_dedupe_images_withRepeatedLocations_shouldKeepFirstOccurrence() {
    let images = vec![
        image(Some("/1.png"), None),
        image(Some("/2.png"), None),
        image(Some("/1.png"), None),
        image(None, Some("/legacy.png")),
        image(None, Some("/legacy.png")),
        image(None, None),
        image(None, None),
    ];

    let unique = dedupe_images(images);

    let sources: Vec<Option<&str>> = unique.iter().map(ImageRecord::source).collect();
    assert_eq!(
        sources,
        vec![Some("/1.png"), Some("/2.png"), Some("/legacy.png"), None, None]
    );
}

#[test]
fn test_image_generation_request_shouldOmitMissingSubtopic() {
    let all = serde_json::to_value(ImageGenerationRequest {
        content_id: "4".into(),
        subtopic_index: None,
    })
    .unwrap();
    let one = serde_json::to_value(ImageGenerationRequest {
        content_id: "4".into(),
        subtopic_index: Some(2),
    })
    .unwrap();

    assert_eq!(all, json!({"content_id": "4"}));
    assert_eq!(one, json!({"content_id": "4", "subtopic_index": 2}));
}
