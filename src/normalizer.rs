use crate::models::{InlineItem, StyledText};
use regex::Regex;

/// Collapse every run of whitespace (spaces, tabs, newlines) to a single
/// ASCII space. Leading and trailing runs collapse too but are not removed;
/// edge trimming is sequence-level, not payload-level.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            out.push(ch);
            in_run = false;
        }
    }
    out
}

/// Wrap a text fragment according to the formatting context it was emitted
/// under. Promotion happens here, before coalescing, so consecutive
/// fragments of the same poetry level merge into one styled run.
pub fn promote(text: String, poem: Option<u8>, words_of_jesus: bool) -> InlineItem {
    if poem.is_none() && !words_of_jesus {
        InlineItem::Text(text)
    } else {
        InlineItem::Styled(StyledText {
            text,
            poem,
            words_of_jesus: if words_of_jesus { Some(true) } else { None },
        })
    }
}

/// Append an item to an inline-content run, collapsing whitespace in its
/// payload and coalescing it into the tail when both are plain strings or
/// both are styled runs with identical formatting.
pub fn push_inline(items: &mut Vec<InlineItem>, item: InlineItem) {
    let item = match item {
        InlineItem::Text(text) => {
            let text = collapse_whitespace(&text);
            if text.is_empty() {
                return;
            }
            InlineItem::Text(text)
        }
        InlineItem::Styled(styled) => {
            let text = collapse_whitespace(&styled.text);
            if text.is_empty() {
                return;
            }
            if styled.is_plain() {
                InlineItem::Text(text)
            } else {
                InlineItem::Styled(StyledText { text, ..styled })
            }
        }
        note @ InlineItem::Note(_) => note,
    };

    match (items.last_mut(), item) {
        (Some(InlineItem::Text(tail)), InlineItem::Text(text)) => {
            tail.push_str(&text);
            *tail = collapse_whitespace(tail);
        }
        (Some(InlineItem::Styled(tail)), InlineItem::Styled(styled))
            if tail.same_formatting(&styled) =>
        {
            tail.text.push_str(&styled.text);
            tail.text = collapse_whitespace(&tail.text);
        }
        (_, item) => items.push(item),
    }
}

/// Strip leading and trailing whitespace off a finished inline-content run,
/// dropping edge entries that become empty.
pub fn finish_inline(items: &mut Vec<InlineItem>) {
    loop {
        match items.first_mut() {
            Some(InlineItem::Text(text)) => {
                let trimmed = text.trim_start();
                if trimmed.is_empty() {
                    items.remove(0);
                    continue;
                }
                if trimmed.len() != text.len() {
                    *text = trimmed.to_string();
                }
            }
            Some(InlineItem::Styled(styled)) => {
                let trimmed = styled.text.trim_start();
                if trimmed.is_empty() {
                    items.remove(0);
                    continue;
                }
                if trimmed.len() != styled.text.len() {
                    styled.text = trimmed.to_string();
                }
            }
            _ => {}
        }
        break;
    }

    loop {
        match items.last_mut() {
            Some(InlineItem::Text(text)) => {
                let trimmed = text.trim_end();
                if trimmed.is_empty() {
                    items.pop();
                    continue;
                }
                if trimmed.len() != text.len() {
                    *text = trimmed.to_string();
                }
            }
            Some(InlineItem::Styled(styled)) => {
                let trimmed = styled.text.trim_end();
                if trimmed.is_empty() {
                    items.pop();
                    continue;
                }
                if trimmed.len() != styled.text.len() {
                    styled.text = trimmed.to_string();
                }
            }
            _ => {}
        }
        break;
    }
}

/// Normalize footnote text: collapse whitespace, trim, and strip the
/// leading `C:V` reference many sources prepend to the note body.
pub fn clean_note_text(reference_pattern: &Regex, raw: &str) -> String {
    let collapsed = collapse_whitespace(raw);
    let trimmed = collapsed.trim();
    reference_pattern.replace(trimmed, "").trim_start().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoteReference;

    fn styled(text: &str, poem: Option<u8>, wj: bool) -> InlineItem {
        InlineItem::Styled(StyledText {
            text: text.to_string(),
            poem,
            words_of_jesus: if wj { Some(true) } else { None },
        })
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("a  b\n\tc"), "a b c");
        assert_eq!(collapse_whitespace("  a "), " a ");
        assert_eq!(collapse_whitespace(""), "");
    }

    #[test]
    fn test_adjacent_strings_coalesce() {
        let mut items = Vec::new();
        push_inline(&mut items, InlineItem::Text("In the ".to_string()));
        push_inline(&mut items, InlineItem::Text(" beginning".to_string()));
        assert_eq!(items, vec![InlineItem::Text("In the beginning".to_string())]);
    }

    #[test]
    fn test_styled_runs_merge_on_identical_formatting() {
        let mut items = Vec::new();
        push_inline(&mut items, styled("The LORD is", Some(1), false));
        push_inline(&mut items, styled(" my shepherd", Some(1), false));
        assert_eq!(items, vec![styled("The LORD is my shepherd", Some(1), false)]);
    }

    #[test]
    fn test_differing_formatting_stays_separate() {
        let mut items = Vec::new();
        push_inline(&mut items, styled("blessed", Some(2), true));
        push_inline(&mut items, styled(" are the poor", Some(2), false));
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_empty_payloads_are_dropped() {
        let mut items = Vec::new();
        push_inline(&mut items, InlineItem::Text(String::new()));
        push_inline(&mut items, styled("", Some(1), false));
        assert!(items.is_empty());
    }

    #[test]
    fn test_plain_styled_demotes_to_string() {
        let mut items = Vec::new();
        push_inline(&mut items, styled("plain", None, false));
        assert_eq!(items, vec![InlineItem::Text("plain".to_string())]);
    }

    #[test]
    fn test_finish_trims_sequence_edges_only() {
        let mut items = vec![
            InlineItem::Text("  lead".to_string()),
            styled(" mid ", Some(1), false),
            InlineItem::Text("tail  ".to_string()),
        ];
        finish_inline(&mut items);
        assert_eq!(
            items,
            vec![
                InlineItem::Text("lead".to_string()),
                styled(" mid ", Some(1), false),
                InlineItem::Text("tail".to_string()),
            ]
        );
    }

    #[test]
    fn test_finish_drops_emptied_edges() {
        let mut items = vec![
            InlineItem::Text("   ".to_string()),
            InlineItem::Note(NoteReference { note_id: 0 }),
            InlineItem::Text(" ".to_string()),
        ];
        finish_inline(&mut items);
        assert_eq!(items, vec![InlineItem::Note(NoteReference { note_id: 0 })]);
    }

    #[test]
    fn test_clean_note_text_strips_reference() {
        let pattern = Regex::new(r"^\d{1,3}:\d{1,3}").unwrap();
        assert_eq!(
            clean_note_text(&pattern, " 1:1  In the beginning "),
            "In the beginning"
        );
        assert_eq!(clean_note_text(&pattern, "Or  waters"), "Or waters");
    }
}
