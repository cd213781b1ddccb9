use blocknote_core::engine::insert_text;
use blocknote_core::{
    BlockId, BlockKind, BlockSnapshot, Document, MediaKind, RestructureBridge, RestructureError,
    StructureRequest, StructuringService,
};
use std::sync::Mutex;

/// Replies with a fixed response and records the request text.
struct CannedService {
    response: Result<String, String>,
    seen: Mutex<Vec<String>>,
}

impl CannedService {
    fn ok(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl StructuringService for CannedService {
    async fn structure(&self, request: StructureRequest) -> Result<String, String> {
        self.seen.lock().unwrap().push(request.text);
        self.response.clone()
    }
}

fn document_with_media() -> Document {
    Document::from_snapshot(&[
        BlockSnapshot::new("a", BlockKind::Text, "intro paragraph"),
        BlockSnapshot::media("img", MediaKind::Image, "https://cdn/p.png", "p.png"),
        BlockSnapshot::new("b", BlockKind::Bullet, "  "),
        BlockSnapshot::new("c", BlockKind::Text, "x marks"),
    ])
}

#[tokio::test]
async fn heading_and_unknown_type_replace_text_and_keep_media_last() {
    let bridge = RestructureBridge::new(10_000);
    let service = CannedService::ok(
        r#"[{"type":"heading1","content":"Intro"},{"type":"bogus","content":"X"}]"#,
    );
    let mut doc = document_with_media();

    let pending = bridge.prepare(&doc).unwrap().unwrap();
    let reply = pending.fetch(&service).await.unwrap();
    let outcome = reply.apply(&mut doc).unwrap();

    assert_eq!(
        service.seen.lock().unwrap().as_slice(),
        &["intro paragraph\nx marks".to_string()]
    );
    let kinds: Vec<BlockKind> = doc.root_blocks().map(|block| block.kind()).collect();
    assert_eq!(kinds, vec![BlockKind::Heading1, BlockKind::Text, BlockKind::Image]);
    let texts: Vec<Option<&str>> = doc.root_blocks().map(|block| block.text()).collect();
    assert_eq!(texts[..2], [Some("Intro"), Some("X")]);
    assert_eq!(doc.roots()[2], BlockId::new("img"));
    assert_eq!(outcome.focus.block_id, doc.roots()[0]);
    assert!(!doc.contains(&BlockId::new("a")));
    assert!(!bridge.is_busy());
}

#[tokio::test]
async fn prose_wrapped_response_is_accepted() {
    let bridge = RestructureBridge::new(10_000);
    let service = CannedService::ok(
        "Here is the structure:\n```json\n[{\"type\":\"list\",\"content\":\"a\"},{\"type\":\"todo\",\"content\":\"b\",\"checked\":true}]\n```",
    );
    let mut doc = document_with_media();

    let reply = bridge
        .prepare(&doc)
        .unwrap()
        .unwrap()
        .fetch(&service)
        .await
        .unwrap();
    reply.apply(&mut doc).unwrap();

    let blocks: Vec<_> = doc.root_blocks().collect();
    assert_eq!(blocks[0].kind(), BlockKind::Bullet);
    assert_eq!(blocks[1].kind(), BlockKind::Todo);
    assert_eq!(blocks[1].checked(), Some(true));
}

#[tokio::test]
async fn malformed_and_empty_responses_leave_document_untouched() {
    for response in ["not json at all", "[1, 2]", "[]"] {
        let bridge = RestructureBridge::new(10_000);
        let service = CannedService::ok(response);
        let doc = document_with_media();
        let before = doc.to_snapshot();

        let err = bridge
            .prepare(&doc)
            .unwrap()
            .unwrap()
            .fetch(&service)
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            RestructureError::Malformed(_) | RestructureError::EmptyResponse
        ));
        assert_eq!(doc.to_snapshot(), before);
        assert!(!bridge.is_busy());
    }
}

#[tokio::test]
async fn service_failure_is_reported() {
    let bridge = RestructureBridge::new(10_000);
    let service = CannedService::failing("timeout");
    let doc = document_with_media();

    let err = bridge
        .prepare(&doc)
        .unwrap()
        .unwrap()
        .fetch(&service)
        .await
        .err()
        .unwrap();
    assert_eq!(err, RestructureError::Service("timeout".to_string()));
}

#[tokio::test]
async fn edits_during_round_trip_make_the_reply_stale() {
    let bridge = RestructureBridge::new(10_000);
    let service = CannedService::ok(r#"[{"type":"text","content":"new"}]"#);
    let mut doc = document_with_media();

    let pending = bridge.prepare(&doc).unwrap().unwrap();
    let reply = pending.fetch(&service).await.unwrap();
    insert_text(&mut doc, &BlockId::new("a"), 0, "typed ").unwrap();
    let before = doc.to_snapshot();

    let err = reply.apply(&mut doc).unwrap_err();
    assert!(matches!(err, RestructureError::Stale { .. }));
    assert_eq!(doc.to_snapshot(), before);
    assert!(!bridge.is_busy());
}

#[tokio::test]
async fn second_request_while_pending_is_busy() {
    let bridge = RestructureBridge::new(10_000);
    let doc = document_with_media();

    let first = bridge.prepare(&doc).unwrap().unwrap();
    assert!(matches!(bridge.prepare(&doc), Err(RestructureError::Busy)));
    drop(first);
    assert!(bridge.prepare(&doc).unwrap().is_some());
}

#[test]
fn media_only_document_skips_the_round_trip() {
    let bridge = RestructureBridge::new(10_000);
    let doc = Document::from_snapshot(&[BlockSnapshot::media(
        "f",
        MediaKind::File,
        "https://cdn/a.pdf",
        "a.pdf",
    )]);
    assert!(bridge.prepare(&doc).unwrap().is_none());
}
