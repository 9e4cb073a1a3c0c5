use crate::streaming::test_utils::{tagged_insights_json, update_tag, RecordingSink};
use crate::streaming::AnalysisOutcome;
use crate::trigger::{AnalyzerConfig, DebouncedAnalyzer};
use llm::streaming::{ScriptedSource, ScriptedStream};
use llm::{Message, StreamSource};
use std::sync::Arc;
use std::time::Duration;

fn transcript_with(last: &str) -> Vec<Message> {
    vec![Message::user("earlier context"), Message::user(last.to_string())]
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_triggers_coalesces_to_one_run() {
    let json = tagged_insights_json("coalesced");
    let source = Arc::new(ScriptedSource::repeating(ScriptedStream::new(vec![
        json.as_str(),
    ])));
    let sink = RecordingSink::new();
    let analyzer = DebouncedAnalyzer::new(
        source.clone() as Arc<dyn StreamSource>,
        Arc::new(sink.clone()),
        AnalyzerConfig::default(),
    );

    // Five updates within 50ms, well inside the 300ms debounce window
    for i in 1..=5 {
        analyzer.notify(transcript_with(&format!("message {i}")));
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // Let the surviving timer fire and the run complete
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(source.open_count(), 1, "burst must coalesce into one run");
    assert!(
        source.requests()[0].messages[0].content.contains("message 5"),
        "the run must use the newest transcript snapshot"
    );
    assert_eq!(sink.finals().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_spaced_triggers_each_run() {
    let json = tagged_insights_json("spaced");
    let source = Arc::new(ScriptedSource::repeating(ScriptedStream::new(vec![
        json.as_str(),
    ])));
    let sink = RecordingSink::new();
    let analyzer = DebouncedAnalyzer::new(
        source.clone() as Arc<dyn StreamSource>,
        Arc::new(sink.clone()),
        AnalyzerConfig::default(),
    );

    analyzer.notify(transcript_with("first"));
    tokio::time::sleep(Duration::from_secs(2)).await;
    analyzer.notify(transcript_with("second"));
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(source.open_count(), 2);
    assert_eq!(sink.finals().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_new_trigger_cancels_inflight_run() {
    // Run A streams its result early, then keeps trickling trailing chunks
    // long enough for run B to supersede it mid-flight
    let json_a = tagged_insights_json("A");
    let trailing: Vec<String> = (0..40).map(|i| format!(" trailing {i}")).collect();
    let mut chunks_a: Vec<&str> = vec![json_a.as_str()];
    chunks_a.extend(trailing.iter().map(String::as_str));

    let json_b = tagged_insights_json("B");
    let source = Arc::new(ScriptedSource::new(vec![
        ScriptedStream::new(chunks_a).with_chunk_delay(Duration::from_millis(100)),
        ScriptedStream::new(vec![json_b.as_str()]),
    ]));

    let sink = RecordingSink::new();
    let analyzer = DebouncedAnalyzer::new(
        source.clone() as Arc<dyn StreamSource>,
        Arc::new(sink.clone()),
        AnalyzerConfig::default(),
    );

    analyzer.notify(transcript_with("state A"));
    // A's debounce elapses at 300ms and its first chunks stream in
    tokio::time::sleep(Duration::from_millis(800)).await;
    analyzer.notify(transcript_with("state B"));
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(source.open_count(), 2);

    // A's partial output arrived before B started; after B's first update
    // nothing from A may reach the sink again
    let partial_tags: Vec<Option<String>> =
        sink.partials().iter().map(update_tag).collect();
    if let Some(first_b) = partial_tags.iter().position(|t| t.as_deref() == Some("B")) {
        assert!(
            partial_tags[first_b..]
                .iter()
                .all(|t| t.as_deref() != Some("A")),
            "late output of the superseded run leaked past cancellation"
        );
    }

    // Only B's outcome is ever final
    let finals = sink.finals();
    assert_eq!(finals.len(), 1);
    match &finals[0] {
        AnalysisOutcome::Completed(update) => {
            assert_eq!(update_tag(update).as_deref(), Some("B"))
        }
        other => panic!("Expected completed outcome, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_repeated_supersession_tracks_newest_run() {
    // Several back-to-back supersessions: the stored live run must always be
    // the newest one, so only the last run survives to a final outcome
    let json_slow = tagged_insights_json("slow");
    let trailing: Vec<String> = (0..40).map(|i| format!(" trailing {i}")).collect();
    let mut slow_chunks: Vec<&str> = vec![json_slow.as_str()];
    slow_chunks.extend(trailing.iter().map(String::as_str));
    let json_last = tagged_insights_json("last");

    let slow_stream =
        ScriptedStream::new(slow_chunks).with_chunk_delay(Duration::from_millis(100));
    let source = Arc::new(ScriptedSource::new(vec![
        slow_stream.clone(),
        slow_stream,
        ScriptedStream::new(vec![json_last.as_str()]),
    ]));

    let sink = RecordingSink::new();
    let analyzer = DebouncedAnalyzer::new(
        source.clone() as Arc<dyn StreamSource>,
        Arc::new(sink.clone()),
        AnalyzerConfig::default(),
    );

    for label in ["one", "two", "three"] {
        analyzer.notify(transcript_with(label));
        // Past the debounce window, but well before the slow streams finish
        tokio::time::sleep(Duration::from_millis(600)).await;
    }
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(source.open_count(), 3);
    let finals = sink.finals();
    assert_eq!(finals.len(), 1);
    match &finals[0] {
        AnalysisOutcome::Completed(update) => {
            assert_eq!(update_tag(update).as_deref(), Some("last"))
        }
        other => panic!("Expected completed outcome, got {:?}", other),
    }
    assert!(!analyzer.is_analyzing());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_pending_run() {
    let json = tagged_insights_json("unwanted");
    let source = Arc::new(ScriptedSource::repeating(ScriptedStream::new(vec![
        json.as_str(),
    ])));
    let sink = RecordingSink::new();
    let analyzer = DebouncedAnalyzer::new(
        source.clone() as Arc<dyn StreamSource>,
        Arc::new(sink.clone()),
        AnalyzerConfig::default(),
    );

    analyzer.notify(transcript_with("about to be discarded"));
    analyzer.shutdown().await;
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(source.open_count(), 0);
    assert!(sink.finals().is_empty());
    assert!(!analyzer.is_analyzing());
}
