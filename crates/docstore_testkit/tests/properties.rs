//! Property tests over generated documents and edit scripts.

use docstore_core::NodeReader;
use docstore_model::{Operation, Selection};
use docstore_testkit::prelude::*;
use proptest::prelude::*;

fn leaf_len(store: &docstore_core::DocumentStore, id: &str) -> usize {
    store.get_node(&id.into()).map_or(0, |n| n.text_len())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_step_undoes_exactly((text, marks) in leaf_strategy(), script in edit_script_strategy(8)) {
        let store = DocumentBuilder::new()
            .marked_block("p1", "paragraph", vec![("t1", text.as_str(), marks)])
            .store();

        for step in script {
            let before = store.snapshot();
            let op = step.to_operation("t1", leaf_len(&store, "t1"));
            let txn = store.execute(&[op]).unwrap();

            store.transactions().undo(&txn).unwrap();
            prop_assert_eq!(store.snapshot(), before);
            store.transactions().redo(&txn).unwrap();
        }
    }

    #[test]
    fn marks_stay_normalized((text, marks) in leaf_strategy(), script in edit_script_strategy(12)) {
        let store = DocumentBuilder::new()
            .marked_block("p1", "paragraph", vec![("t1", text.as_str(), marks)])
            .store();

        for step in script {
            let op = step.to_operation("t1", leaf_len(&store, "t1"));
            store.execute(&[op]).unwrap();
            assert_store_sound(&store);
        }
    }

    #[test]
    fn failed_transactions_change_nothing(
        (text, marks) in leaf_strategy(),
        script in edit_script_strategy(6),
    ) {
        let store = DocumentBuilder::new()
            .marked_block("p1", "paragraph", vec![("t1", text.as_str(), marks)])
            .store();
        let before = store.snapshot();

        // Offsets use the starting length, so any step may fail; the last
        // one always does.
        let len = leaf_len(&store, "t1");
        let mut ops: Vec<Operation> = script.iter().map(|s| s.to_operation("t1", len)).collect();
        ops.push(Operation::delete_node("missing"));

        let result = store.run(&ops);
        prop_assert!(!result.success);
        prop_assert_eq!(store.snapshot(), before);
        prop_assert_eq!(result.selection_after, result.selection_before);
    }

    #[test]
    fn deletion_clamps_caret(text in "[a-z]{1,20}", caret in 0usize..=20, a in 0usize..=20, b in 0usize..=20) {
        let len = text.chars().count();
        let caret = caret.min(len);
        let (start, end) = (a.min(b).min(len), a.max(b).min(len));

        let store = DocumentBuilder::new()
            .block("p1", "paragraph", &[("t1", text.as_str())])
            .selection(Selection::caret("t1", caret))
            .store();
        store.execute(&[Operation::delete_text("t1", start, end)]).unwrap();

        let expected = if caret < start {
            caret
        } else if caret < end {
            start
        } else {
            caret - (end - start)
        };
        prop_assert_eq!(store.selection(), Some(Selection::caret("t1", expected)));
    }

    #[test]
    fn history_walks_back_and_forth((text, marks) in leaf_strategy(), script in edit_script_strategy(8)) {
        let store = DocumentBuilder::new()
            .marked_block("p1", "paragraph", vec![("t1", text.as_str(), marks)])
            .store();
        let initial = store.snapshot();

        for step in script {
            let op = step.to_operation("t1", leaf_len(&store, "t1"));
            store.execute(&[op]).unwrap();
        }
        let edited = store.snapshot();

        while store.can_undo() {
            store.undo().unwrap();
        }
        assert_same_document(&store.snapshot(), &initial);

        while store.can_redo() {
            store.redo().unwrap();
        }
        assert_same_document(&store.snapshot(), &edited);
    }

    #[test]
    fn generated_documents_are_sound(leaves in prop::collection::vec(leaf_strategy(), 1..5)) {
        let ids: Vec<String> = (0..leaves.len()).map(|i| format!("t{i}")).collect();
        let block = leaves
            .iter()
            .zip(&ids)
            .map(|((text, marks), id)| (id.as_str(), text.as_str(), marks.clone()))
            .collect();

        let store = DocumentBuilder::new().marked_block("p1", "paragraph", block).store();
        assert_store_sound(&store);
    }
}
