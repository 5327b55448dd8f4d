//! Recognizes table commands embedded in free-form assistant text.
//!
//! Three phrasings are understood, case-insensitively:
//!
//! ```text
//! update [the] [value in] row <N>[,] [column] '<COLUMN>' to '<VALUE>'
//! add [a] new row with <KEY>='<VALUE>', <KEY>="<VALUE>", ...
//! delete row <N>
//! ```
//!
//! Quotes around the update column and value are optional. `<N>` counts rows from 1, the way
//! users see them; extracted intents carry 0-based indices. A row number that cannot be an
//! index still yields a command, so it is reported rather than lost. The add phrase consumes
//! the rest of its line and only well-formed quoted pairs are kept.

use std::sync::OnceLock;

use regex::Regex;
use sheetpilot_model::{CellValue, MutationIntent, MutationKind, RowData};

/// One command recognized in the text.
#[derive(Clone, Debug, PartialEq)]
pub enum ExtractedCommand {
    Intent(MutationIntent),
    /// The phrase matched but its row number names no row: `row 0`, or a number too large
    /// to index. `row` keeps the digits as written.
    InvalidRow { kind: MutationKind, row: String },
}

fn update_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?i)update\s+(?:the\s+)?(?:value\s+in\s+)?row\s+(\d+)(?:,\s*|\s+)(?:column\s+)?['"]?([^'"]+)['"]?\s+to\s+['"]?([^'"]+)['"]?"#,
        )
        .expect("valid regex")
    })
}

fn add_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)add\s+(?:a\s+)?new\s+row\s+with\s+(.+)").expect("valid regex"))
}

fn pair_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"([^=,]+)=(?:'|")([^'"]+)(?:'|")"#).expect("valid regex"))
}

fn delete_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)delete\s+row\s+(\d+)").expect("valid regex"))
}

/// 1-based row reference to a 0-based index. `None` for row 0 and numbers that overflow.
fn row_index(digits: &str) -> Option<usize> {
    digits.parse::<usize>().ok()?.checked_sub(1)
}

fn row_command(
    digits: &str,
    kind: MutationKind,
    intent: impl FnOnce(usize) -> MutationIntent,
) -> ExtractedCommand {
    match row_index(digits) {
        Some(row) => ExtractedCommand::Intent(intent(row)),
        None => {
            log::debug!("row reference {digits:?} names no row");
            ExtractedCommand::InvalidRow {
                kind,
                row: digits.to_string(),
            }
        }
    }
}

fn parse_pairs(text: &str) -> RowData {
    let mut data = RowData::new();
    for cap in pair_re().captures_iter(text) {
        let key = cap[1].trim();
        if key.is_empty() {
            continue;
        }
        data.insert(key.to_string(), CellValue::Text(cap[2].trim().to_string()));
    }
    data
}

/// Ordering key: position in the text, then update before add before delete.
type Ranked = (usize, u8, ExtractedCommand);

/// Extract every recognized command from `text`, in the order it appears.
///
/// Intents carry no sheet; the caller decides which sheet they target. Never fails: text with
/// no recognizable command yields an empty list.
pub fn extract_commands(text: &str) -> Vec<ExtractedCommand> {
    let mut found: Vec<Ranked> = Vec::new();

    for cap in update_re().captures_iter(text) {
        let column = cap[2].trim();
        let value = cap[3].trim();
        let start = cap.get(0).map_or(0, |m| m.start());
        let command = row_command(&cap[1], MutationKind::Update, |row| {
            MutationIntent::update_cell(row, column, CellValue::Text(value.to_string()))
        });
        found.push((start, 0, command));
    }

    for cap in add_re().captures_iter(text) {
        let data = parse_pairs(cap[1].trim());
        let start = cap.get(0).map_or(0, |m| m.start());
        if data.is_empty() {
            log::debug!("add-row phrase at offset {start} has no key='value' pairs");
            continue;
        }
        found.push((start, 1, ExtractedCommand::Intent(MutationIntent::add_row(data))));
    }

    for cap in delete_re().captures_iter(text) {
        let start = cap.get(0).map_or(0, |m| m.start());
        let command = row_command(&cap[1], MutationKind::Delete, MutationIntent::delete_row);
        found.push((start, 2, command));
    }

    found.sort_by_key(|(start, priority, _)| (*start, *priority));
    found.into_iter().map(|(_, _, command)| command).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetpilot_model::Mutation;

    /// Extracted intents, for text where every row reference is valid.
    fn extract_intents(text: &str) -> Vec<MutationIntent> {
        extract_commands(text)
            .into_iter()
            .map(|command| match command {
                ExtractedCommand::Intent(intent) => intent,
                other => panic!("unexpected {other:?}"),
            })
            .collect()
    }

    fn row_data(pairs: &[(&str, &str)]) -> RowData {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), CellValue::from(*v)))
            .collect()
    }

    #[test]
    fn canonical_phrasings() {
        assert_eq!(
            extract_intents("update row 5, column 'Price' to '25.99'"),
            vec![MutationIntent::update_cell(4, "Price", "25.99")]
        );
        assert_eq!(
            extract_intents("add a new row with Name='Widget', Price='9.99'"),
            vec![MutationIntent::add_row(row_data(&[
                ("Name", "Widget"),
                ("Price", "9.99")
            ]))]
        );
        assert_eq!(
            extract_intents("delete row 8"),
            vec![MutationIntent::delete_row(7)]
        );
    }

    #[test]
    fn update_with_optional_words() {
        assert_eq!(
            extract_intents("Please update row 5, column 'Price' to '25.99'"),
            vec![MutationIntent::update_cell(4, "Price", "25.99")]
        );
        assert_eq!(
            extract_intents("I will Update the value in row 2 Status to Done"),
            vec![MutationIntent::update_cell(1, "Status", "Done")]
        );
    }

    #[test]
    fn add_row_collects_quoted_pairs() {
        assert_eq!(
            extract_intents(r#"Add a new row with Name='Widget', Price="9.99""#),
            vec![MutationIntent::add_row(row_data(&[
                ("Name", "Widget"),
                ("Price", "9.99")
            ]))]
        );
    }

    #[test]
    fn add_row_without_pairs_is_ignored() {
        assert_eq!(extract_intents("add a new row with nothing useful"), vec![]);
    }

    #[test]
    fn delete_row_is_one_based() {
        assert_eq!(
            extract_intents("delete row 3"),
            vec![MutationIntent::delete_row(2)]
        );
    }

    #[test]
    fn no_commands_yields_nothing() {
        assert!(extract_intents("").is_empty());
        assert!(extract_intents("The table looks fine to me.").is_empty());
    }

    #[test]
    fn row_zero_and_overflow_are_reported() {
        let huge = "99999999999999999999999999";
        assert_eq!(
            extract_commands(&format!("delete row 0 then update row {huge} Price to 1")),
            vec![
                ExtractedCommand::InvalidRow {
                    kind: MutationKind::Delete,
                    row: "0".into(),
                },
                ExtractedCommand::InvalidRow {
                    kind: MutationKind::Update,
                    row: huge.into(),
                },
            ]
        );
    }

    #[test]
    fn intents_follow_text_order() {
        let text = "First delete row 4.\nThen update row 1 'Stock' to '7'.\nadd new row with Name='X'";
        let kinds: Vec<_> = extract_intents(text)
            .into_iter()
            .map(|intent| intent.mutation)
            .collect();
        assert_eq!(
            kinds,
            vec![
                Mutation::DeleteRow { row: 3 },
                Mutation::UpdateCell {
                    row: 0,
                    column: "Stock".into(),
                    value: "7".into(),
                },
                Mutation::AddRow {
                    data: row_data(&[("Name", "X")]),
                },
            ]
        );
    }

    #[test]
    fn extraction_is_deterministic() {
        let text = "update row 1 A to B and delete row 2 and delete row 1";
        assert_eq!(extract_commands(text), extract_commands(text));
        assert_eq!(extract_commands(text).len(), 3);
    }
}
