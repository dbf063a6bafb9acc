use project_patcher::patch::{apply_patch, create_patch, split_lines, Direction, Patch, PatchError};
use proptest::prelude::*;

fn line_strategy() -> impl Strategy<Value = String> {
    let charset = prop_oneof![
        Just('a'),
        Just('b'),
        Just('c'),
        Just(' '),
        Just('-'),
        Just('+'),
        Just('@'),
        Just('\\'),
        Just('\r'),
    ];
    proptest::collection::vec(charset, 0..6).prop_map(|chars| chars.into_iter().collect())
}

/// Text bodies built from a small alphabet so edits overlap often, with and
/// without a final terminator.
fn text_strategy() -> impl Strategy<Value = String> {
    (proptest::collection::vec(line_strategy(), 0..16), any::<bool>()).prop_map(
        |(lines, trailing_newline)| {
            let mut text = lines.join("\n");
            if trailing_newline && !lines.is_empty() {
                text.push('\n');
            }
            text
        },
    )
}

proptest! {
    #[test]
    fn apply_reproduces_new_text(old in text_strategy(), new in text_strategy()) {
        let patch = create_patch(&old, &new, "file.txt");
        let applied = apply_patch(&old, &patch, Direction::Forward).unwrap();
        prop_assert_eq!(applied, new);
    }

    #[test]
    fn revert_reproduces_old_text(old in text_strategy(), new in text_strategy()) {
        let patch = create_patch(&old, &new, "file.txt");
        let reverted = apply_patch(&new, &patch, Direction::Revert).unwrap();
        prop_assert_eq!(reverted, old);
    }

    #[test]
    fn identical_texts_give_empty_patch(text in text_strategy()) {
        let patch = create_patch(&text, &text, "file.txt");
        prop_assert!(patch.is_empty());
        prop_assert_eq!(patch.to_string(), "");
    }

    #[test]
    fn written_patch_parses_back(old in text_strategy(), new in text_strategy()) {
        let patch = create_patch(&old, &new, "file.txt");
        let parsed = Patch::parse(&patch.to_string()).unwrap();
        prop_assert_eq!(&parsed.hunks, &patch.hunks);
        prop_assert_eq!(apply_patch(&old, &parsed, Direction::Forward).unwrap(), new);
    }

    #[test]
    fn start_past_end_is_rejected(text in text_strategy()) {
        let line_count = split_lines(&text).len();
        let document = format!("@@ -{},1 +{},1 @@\n-x\n+y\n", line_count + 2, line_count + 2);
        let patch = Patch::parse(&document).unwrap();
        let err = apply_patch(&text, &patch, Direction::Forward).unwrap_err();
        let is_bad_line = matches!(err, PatchError::BadLineNumber { .. });
        prop_assert!(is_bad_line);
    }
}

#[test]
fn trailing_newline_added_and_removed() {
    let without = "one\ntwo";
    let with = "one\ntwo\n";

    let add = create_patch(without, with, "f");
    assert!(add.to_string().contains("\\ No newline at end of file"));
    assert_eq!(apply_patch(without, &add, Direction::Forward).unwrap(), with);
    assert_eq!(apply_patch(with, &add, Direction::Revert).unwrap(), without);

    let remove = create_patch(with, without, "f");
    assert_eq!(apply_patch(with, &remove, Direction::Forward).unwrap(), without);
}

#[test]
fn malformed_header_is_rejected() {
    let err = Patch::parse("@@ -1,x +1 @@\n-a\n+b\n").unwrap_err();
    assert!(matches!(err, PatchError::MalformedHunkHeader { line: 1, .. }));
}
