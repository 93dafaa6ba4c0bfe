/*!
 * Tests for mobile text reflow
 */

use blogflow::formatting::{MobileFormatter, format_for_mobile, format_html_for_mobile};

fn words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

#[test]
fn test_format_for_mobile_withMixedDocument_shouldKeepStructureAndOrder() {
    let input = "## 캠핑 준비물\n\
                 캠핑을 처음 시작하는 분들을 위해 꼭 필요한 준비물을 정리했습니다. 텐트와 침낭은 필수입니다.\n\
                 \n\
                 - 텐트\n\
                 - 침낭\n\
                 | 항목 | 가격 |\n\
                 ```\n\
                 plain words inside a fence are wrapped like any other line\n\
                 ```";

    let output = format_for_mobile(input);
    let lines: Vec<&str> = output.split('\n').collect();

    assert_eq!(lines[0], "## 캠핑 준비물");
    assert!(lines.contains(&""));
    assert!(lines.contains(&"- 텐트"));
    assert!(lines.contains(&"| 항목 | 가격 |"));
    assert_eq!(words(&output), words(input));
}

#[test]
fn test_format_for_mobile_withLongParagraph_shouldRespectTargetLength() {
    let input = "모바일 화면에서 읽기 쉽도록 문장을 적당한 길이로 나누어 줍니다. 너무 긴 줄은 가독성을 떨어뜨립니다.";
    let output = format_for_mobile(input);

    for line in output.split('\n') {
        let letters = line.chars().filter(|c| !c.is_whitespace()).count();
        assert!(letters <= 20, "line too long: {:?}", line);
    }
    assert_eq!(words(&output), words(input));
}

#[test]
fn test_format_for_mobile_withOversizedWord_shouldHardSplitIntoTargetSlices() {
    let url = "https://example.com/a/very/long/path/segment";
    let output = format_for_mobile(&format!("링크 {} 참고", url));
    let lines: Vec<&str> = output.split('\n').collect();

    assert_eq!(lines[0], "링크");
    assert_eq!(lines[1], &url[..20]);
    assert_eq!(lines[2], &url[20..40]);
    assert_eq!(lines[3], format!("{} 참고", &url[40..]));
}

#[test]
fn test_format_for_mobile_withWhitespaceOnlyLine_shouldEmitUnchanged() {
    assert_eq!(format_for_mobile("a\n   \nb"), "a\n   \nb");
}

#[test]
fn test_format_for_mobile_withNumberedListAndRule_shouldBypassReflow() {
    let input = "12. a list item that is definitely longer than twenty letters\n--- rule text that is long enough to wrap";
    assert_eq!(format_for_mobile(input), input);
}

#[test]
fn test_format_for_mobile_withDashWithoutSpace_shouldReflow() {
    let input = "-not-a-list-item but a plain paragraph line";
    let output = format_for_mobile(input);
    assert_ne!(output, input);
    assert_eq!(words(&output), words(input));
}

#[test]
fn test_format_for_mobile_withMultipleSpaces_shouldCollapseToSingle() {
    assert_eq!(format_for_mobile("  a    b  "), "a b");
}

#[test]
fn test_custom_width_withNarrowTarget_shouldWrapEveryWord() {
    let formatter = MobileFormatter::new(3);
    assert_eq!(formatter.format_for_mobile("abc def ghi"), "abc\ndef\nghi");
}

#[test]
fn test_format_html_for_mobile_withParagraphs_shouldEmitBrSeparatedText() {
    let html = "<h2>제목</h2><p>첫 문장입니다.<br>두 번째 문장입니다.</p>";
    let output = format_html_for_mobile(html);

    assert!(!output.contains("<p>"));
    assert!(!output.contains("<h2>"));
    assert!(output.contains("<br>"));
    assert_eq!(words(&output.replace("<br>", " ")), words("제목첫 문장입니다. 두 번째 문장입니다."));
}

#[test]
fn test_format_html_for_mobile_withSelfClosingVariants_shouldTreatAllAsBreaks() {
    assert_eq!(format_html_for_mobile("a<br>b<BR/>c<br />d"), "a<br>b<br>c<br>d");
}

#[test]
fn test_format_html_for_mobile_withEntities_shouldDecode() {
    assert_eq!(format_html_for_mobile("<b>Tom &amp; Jerry</b>"), "Tom & Jerry");
}

#[test]
fn test_format_for_mobile_withKoreanSentence_shouldWrapInOrder() {
    let input = "일반 문장입니다 이것은 테스트를 위한 긴 한국어 문장입니다.";
    let output = format_for_mobile(input);

    assert!(output.split('\n').count() >= 2);
    assert_eq!(words(&output), words(input));
}

#[test]
fn test_format_for_mobile_withWord35Long_shouldSplitInto20And15() {
    let word: String = ('a'..='z').chain('A'..='I').collect();
    assert_eq!(word.len(), 35);

    let output = format_for_mobile(&word);

    assert_eq!(output, format!("{}\n{}", &word[..20], &word[20..]));
}

#[test]
fn test_format_for_mobile_appliedTwice_shouldBeStable() {
    let input = "캠핑을 처음 시작하는 분들을 위해, 꼭 필요한 준비물을 정리했습니다. 텐트와 침낭, 그리고 랜턴은 필수입니다!\n### 소제목\n두 번째 문단도 충분히 길게 써서 여러 줄로 나뉘도록 합니다.";

    let once = format_for_mobile(input);
    let twice = format_for_mobile(&once);

    assert_eq!(twice, once);
    assert_eq!(words(&twice), words(input));
}
