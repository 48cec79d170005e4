//! Property-based tests: replicas against a plain string model, and
//! replicas against each other.

use proptest::prelude::*;
use synckit_sequence::crdt::Segment;
use synckit_sequence::{Document, Id, Operation, Range, WireMessage};

// =============================================================================
// Test helpers
// =============================================================================

/// A random editing operation, positioned relative to the current length
#[derive(Clone, Debug)]
enum EditOp {
    Insert { pos_pct: f64, content: String },
    Delete { pos_pct: f64, len_pct: f64 },
    Splice { pos_pct: f64, len_pct: f64, content: String },
}

fn content() -> impl Strategy<Value = String> {
    prop::collection::vec(prop_oneof![8 => prop::char::range('a', 'z'), 1 => Just('\n')], 1..8)
        .prop_map(|chars| chars.into_iter().collect())
}

fn arbitrary_edit_op() -> impl Strategy<Value = EditOp> {
    prop_oneof![
        3 => (0.0..=1.0f64, content())
            .prop_map(|(pos_pct, content)| EditOp::Insert { pos_pct, content }),
        1 => (0.0..=1.0f64, 0.0..=0.5f64)
            .prop_map(|(pos_pct, len_pct)| EditOp::Delete { pos_pct, len_pct }),
        1 => (0.0..=1.0f64, 0.0..=0.5f64, content())
            .prop_map(|(pos_pct, len_pct, content)| EditOp::Splice { pos_pct, len_pct, content }),
    ]
}

/// 1-based line/column of the character offset `pos` in `text`
fn point_of(text: &[char], pos: usize) -> (u32, u32) {
    let mut line = 1;
    let mut column = 1;
    for ch in &text[..pos] {
        if *ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

fn range_of(text: &[char], start: usize, end: usize) -> Range {
    let (start_line, start_col) = point_of(text, start);
    let (end_line, end_col) = point_of(text, end);
    Range::new(start_line, start_col, end_line, end_col)
}

fn span(len: usize, pos_pct: f64, len_pct: f64) -> (usize, usize) {
    let start = ((pos_pct * len as f64) as usize).min(len);
    let count = ((len_pct * len as f64) as usize).min(len - start);
    (start, start + count)
}

/// Apply `op` to both the document and the model
fn apply_edit(doc: &mut Document, model: &mut Vec<char>, op: &EditOp) -> Option<Operation> {
    match op {
        EditOp::Insert { pos_pct, content } => {
            let (pos, _) = span(model.len(), *pos_pct, 0.0);
            let (line, column) = point_of(model, pos);
            let result = doc.insert(line, column, content).unwrap();
            model.splice(pos..pos, content.chars());
            result
        }
        EditOp::Delete { pos_pct, len_pct } => {
            let (start, end) = span(model.len(), *pos_pct, *len_pct);
            if start == end {
                return None;
            }
            let result = doc.delete(range_of(model, start, end)).unwrap();
            model.drain(start..end);
            result
        }
        EditOp::Splice { pos_pct, len_pct, content } => {
            let (start, end) = span(model.len(), *pos_pct, *len_pct);
            let result = doc.splice(range_of(model, start, end), content).unwrap();
            model.splice(start..end, content.chars());
            result
        }
    }
}

fn model_text(model: &[char]) -> String {
    model.iter().collect()
}

/// One step of a multi-site session
#[derive(Clone, Debug)]
enum Step {
    Edit { site: usize, op: EditOp },
    Deliver { to: usize, pick_pct: f64 },
}

const SITES: usize = 3;

fn arbitrary_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        2 => (0..SITES, arbitrary_edit_op()).prop_map(|(site, op)| Step::Edit { site, op }),
        3 => (0..SITES, 0.0..1.0f64).prop_map(|(to, pick_pct)| Step::Deliver { to, pick_pct }),
    ]
}

/// An operation and every operation its author had applied before it
struct Broadcast {
    op: Operation,
    seen: Vec<Id>,
}

/// Not yet applied at `doc`, and everything it causally follows is
fn is_deliverable(doc: &Document, broadcast: &Broadcast) -> bool {
    !doc.has_integrated(broadcast.op.id())
        && broadcast.seen.iter().all(|id| doc.has_integrated(*id))
}

// =============================================================================
// Single replica
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Local edits keep the flattened text equal to a plain string model
    #[test]
    fn local_edits_match_string_model(ops in prop::collection::vec(arbitrary_edit_op(), 1..40)) {
        let mut doc = Document::with_site(1).unwrap();
        let mut model = Vec::new();

        for op in &ops {
            apply_edit(&mut doc, &mut model, op);
            prop_assert_eq!(doc.text(), model_text(&model));
        }
        doc.tree().check_invariants().unwrap();
    }

    /// Every visible fragment reports the live range its text occupies
    #[test]
    fn segment_ranges_tile_the_document(ops in prop::collection::vec(arbitrary_edit_op(), 1..30)) {
        let mut doc = Document::with_site(1).unwrap();
        let mut model = Vec::new();
        for op in &ops {
            apply_edit(&mut doc, &mut model, op);
        }

        let mut position = Range::ORIGIN;
        for segment in doc.get_all_segments() {
            prop_assert_eq!(segment.range.start(), position.end());
            if !segment.is_visible {
                prop_assert!(segment.range.is_point());
            }
            position = segment.range;
        }
    }

    /// Splitting anywhere inside a segment partitions its text and offset
    #[test]
    fn split_partitions_segment(text in content(), cut_pct in 0.0..1.0f64) {
        let chars: Vec<char> = text.chars().collect();
        let cut = ((cut_pct * chars.len() as f64) as usize).clamp(1, chars.len());
        let at = range_of(&chars, cut, cut);

        let mut prefix = Segment::new(Id::new(1, 1), text.clone());
        let original = prefix.offset();

        match prefix.split_at(at).unwrap() {
            Some(suffix) => {
                prop_assert_eq!(format!("{}{}", prefix.text(), suffix.text()), text);
                prop_assert_eq!(prefix.offset().end(), suffix.offset().start());
                prop_assert_eq!(prefix.offset().merge(&suffix.offset()), original);
            }
            None => prop_assert_eq!(cut, chars.len()),
        }
    }
}

// =============================================================================
// Several replicas
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A replica replaying another's history in order reaches the same text,
    /// and replaying it again changes nothing
    #[test]
    fn replayed_history_converges(ops in prop::collection::vec(arbitrary_edit_op(), 1..40)) {
        let mut author = Document::with_site(1).unwrap();
        let mut model = Vec::new();
        for op in &ops {
            apply_edit(&mut author, &mut model, op);
        }

        let encoded = WireMessage::history(author.history()).encode().unwrap();
        let history = WireMessage::decode(&encoded).unwrap().into_operations().unwrap();

        let mut replica = Document::with_site(2).unwrap();
        replica.replay_history(history.clone()).unwrap();
        prop_assert_eq!(replica.text(), author.text());

        let segments = replica.get_all_segments();
        prop_assert_eq!(replica.replay_history(history).unwrap(), 0);
        prop_assert_eq!(replica.get_all_segments(), segments);
    }

    /// Delivering one site's operations newest-first still converges once
    /// parked operations are swept
    #[test]
    fn reversed_delivery_converges(ops in prop::collection::vec(arbitrary_edit_op(), 1..20)) {
        let mut author = Document::with_site(1).unwrap();
        let mut model = Vec::new();
        let mut inserts = Vec::new();
        for op in ops.iter().filter(|op| matches!(op, EditOp::Insert { .. })) {
            inserts.extend(apply_edit(&mut author, &mut model, op));
        }

        let mut replica = Document::with_site(2).unwrap();
        for op in inserts.into_iter().rev() {
            replica.integrate_remote(op).unwrap();
        }

        prop_assert_eq!(replica.pending_len(), 0);
        prop_assert_eq!(replica.text(), author.text());
    }

    /// Two sites editing concurrently from a shared base converge after
    /// exchanging their operations
    #[test]
    fn two_sites_converge(
        base in prop::collection::vec(arbitrary_edit_op(), 1..10),
        left in prop::collection::vec(arbitrary_edit_op(), 1..15),
        right in prop::collection::vec(arbitrary_edit_op(), 1..15),
    ) {
        let mut alice = Document::with_site(1).unwrap();
        let mut alice_model = Vec::new();
        for op in &base {
            apply_edit(&mut alice, &mut alice_model, op);
        }

        let mut bob = Document::with_site(2).unwrap();
        bob.replay_history(alice.history().to_vec()).unwrap();
        let mut bob_model = alice_model.clone();

        let from_alice: Vec<Operation> = left
            .iter()
            .filter_map(|op| apply_edit(&mut alice, &mut alice_model, op))
            .collect();
        let from_bob: Vec<Operation> = right
            .iter()
            .filter_map(|op| apply_edit(&mut bob, &mut bob_model, op))
            .collect();

        for op in from_bob {
            alice.integrate_remote(op).unwrap();
        }
        for op in from_alice {
            bob.integrate_remote(op).unwrap();
        }

        prop_assert_eq!(alice.text(), bob.text());
        prop_assert_eq!(alice.pending_len(), 0);
        alice.tree().check_invariants().unwrap();
        bob.tree().check_invariants().unwrap();
    }

    /// Three sites editing between deliveries, each receiving the others'
    /// operations in its own causally valid order, end with the same text
    #[test]
    fn three_sites_converge_under_causal_delivery(steps in prop::collection::vec(arbitrary_step(), 1..60)) {
        let mut docs: Vec<Document> = (1..=SITES as u32)
            .map(|site| Document::with_site(site).unwrap())
            .collect();
        let mut log: Vec<Broadcast> = Vec::new();

        for step in &steps {
            match step {
                Step::Edit { site, op } => {
                    let doc = &mut docs[*site];
                    let seen: Vec<Id> = doc.history().iter().map(|op| op.id()).collect();
                    let mut model: Vec<char> = doc.text().chars().collect();
                    if let Some(op) = apply_edit(doc, &mut model, op) {
                        log.push(Broadcast { op, seen });
                    }
                    prop_assert_eq!(doc.text(), model_text(&model));
                }
                Step::Deliver { to, pick_pct } => {
                    let doc = &mut docs[*to];
                    let ready: Vec<&Broadcast> =
                        log.iter().filter(|b| is_deliverable(doc, b)).collect();
                    if ready.is_empty() {
                        continue;
                    }
                    let pick = ((pick_pct * ready.len() as f64) as usize).min(ready.len() - 1);
                    let op = ready[pick].op.clone();
                    doc.integrate_remote(op).unwrap();
                }
            }
        }

        // The log is in creation order, which is itself causal
        for doc in docs.iter_mut() {
            for broadcast in &log {
                if is_deliverable(doc, broadcast) {
                    doc.integrate_remote(broadcast.op.clone()).unwrap();
                }
            }
        }

        let text = docs[0].text();
        for doc in &docs {
            prop_assert_eq!(doc.text(), text.clone());
            prop_assert_eq!(doc.pending_len(), 0);
            doc.tree().check_invariants().unwrap();
        }
    }
}
