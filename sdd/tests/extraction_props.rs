//! Property tests for the artifact extraction protocol.

use proptest::prelude::*;
use sdd::core::diagnostics::{ErrorInfo, ErrorKind, Severity, group_errors_by_file};
use sdd::core::extract::{extract_code_blocks, extract_single_file};

fn path_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,8}(/[a-z]{1,8}){0,2}\\.(ts|tsx)"
}

/// Bodies that cannot contain a fence.
fn body_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 =;(){}.'\n]{0,60}"
}

proptest! {
    #[test]
    fn text_without_fences_extracts_nothing(text in "[^`]{0,200}") {
        prop_assert!(extract_code_blocks(&text).is_empty());
    }

    #[test]
    fn extraction_is_deterministic(text in "[a-z`:./\n ]{0,200}") {
        prop_assert_eq!(extract_code_blocks(&text), extract_code_blocks(&text));
    }

    #[test]
    fn explicit_blocks_round_trip(
        files in prop::collection::vec((path_strategy(), body_strategy()), 1..6)
    ) {
        let mut response = String::from("Here are the files.\n\n");
        for (path, body) in &files {
            response.push_str(&format!("```typescript:{path}\n{body}\n```\n\n"));
        }
        let blocks = extract_code_blocks(&response);
        for (path, _) in &files {
            let last = files
                .iter()
                .rev()
                .find(|(candidate, _)| candidate == path)
                .map(|(_, body)| format!("{body}\n"));
            prop_assert_eq!(blocks.get(path.as_str()).cloned(), last);
        }
    }

    #[test]
    fn single_file_prefers_explicit_target(
        path in path_strategy(),
        target in body_strategy(),
        other in body_strategy(),
    ) {
        let response = format!("```ts:other.ts\n{other}\n```\n\n```ts:{path}\n{target}\n```\n");
        prop_assert_eq!(extract_single_file(&response, &path), Some(format!("{target}\n")));
    }

    #[test]
    fn grouping_partitions_errors_in_first_seen_order(
        files in prop::collection::vec("[a-c]\\.ts", 0..20)
    ) {
        let errors: Vec<ErrorInfo> = files
            .iter()
            .enumerate()
            .map(|(index, file)| ErrorInfo {
                file: file.clone(),
                line: u32::try_from(index).unwrap_or(u32::MAX) + 1,
                column: None,
                message: "m".to_string(),
                code: None,
                kind: ErrorKind::Type,
                severity: Severity::Error,
            })
            .collect();
        let groups = group_errors_by_file(&errors);

        let total: usize = groups.iter().map(|group| group.errors.len()).sum();
        prop_assert_eq!(total, errors.len());
        let mut first_seen: Vec<&String> = Vec::new();
        for file in &files {
            if !first_seen.contains(&file) {
                first_seen.push(file);
            }
        }
        let group_files: Vec<&String> = groups.iter().map(|group| &group.file).collect();
        prop_assert_eq!(group_files, first_seen);
        for group in &groups {
            prop_assert!(group.errors.iter().all(|error| error.file == group.file));
        }
    }
}
