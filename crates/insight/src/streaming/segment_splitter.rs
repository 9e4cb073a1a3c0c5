//! Splits streamed free text on the answer sentinel marker

pub const ANSWER_OPEN_TAG: &str = "<answer>";
pub const ANSWER_CLOSE_TAG: &str = "</answer>";

/// Thinking/answer view of the accumulated stream text
///
/// `answer` stays `None` until the opening marker has streamed in; a stream
/// that ends without the marker is valid and leaves the whole text as
/// thinking.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Segments {
    pub thinking: String,
    pub answer: Option<String>,
}

/// Length of the longest suffix of `text` that is a proper prefix of
/// `marker`. Held back from the emitted segment so a marker split across
/// chunks never flickers into view.
fn trailing_partial_marker(text: &str, marker: &str) -> usize {
    for len in (1..marker.len()).rev() {
        if text.ends_with(&marker[..len]) {
            return len;
        }
    }
    0
}

/// Split accumulated stream text into thinking and answer segments
///
/// Content before the opening marker is thinking; content after it (with a
/// trailing close marker stripped) is the answer. No validation beyond
/// marker presence; this path carries free-form text. Trailing text that
/// could still grow into a marker is held back until the next snapshot.
pub fn split_segments(buffer: &str) -> Segments {
    split_with(buffer, true)
}

/// Split a finished stream's text
///
/// No more chunks can arrive to complete a partial marker, so nothing is
/// held back: a final answer legitimately ending in `<` or `</answ` is kept
/// verbatim.
pub fn split_segments_final(buffer: &str) -> Segments {
    split_with(buffer, false)
}

fn split_with(buffer: &str, hold_partial: bool) -> Segments {
    match buffer.find(ANSWER_OPEN_TAG) {
        Some(pos) => {
            let thinking = buffer[..pos].trim().to_string();
            let mut answer = &buffer[pos + ANSWER_OPEN_TAG.len()..];
            match answer.find(ANSWER_CLOSE_TAG) {
                Some(end) => answer = &answer[..end],
                None if hold_partial => {
                    let held_back = trailing_partial_marker(answer, ANSWER_CLOSE_TAG);
                    answer = &answer[..answer.len() - held_back];
                }
                None => {}
            }
            Segments {
                thinking,
                answer: Some(answer.trim().to_string()),
            }
        }
        None => {
            let held_back = if hold_partial {
                trailing_partial_marker(buffer, ANSWER_OPEN_TAG)
            } else {
                0
            };
            Segments {
                thinking: buffer[..buffer.len() - held_back].trim().to_string(),
                answer: None,
            }
        }
    }
}
