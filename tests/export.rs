use fsa_store::automaton::fsa::FiniteAutomaton;
use itertools::Itertools;

#[test]
fn test_export_ordering() {
    let mut fsa = FiniteAutomaton::new();

    let q0 = fsa.new_state().unwrap();
    let q1 = fsa.new_state().unwrap();
    let q2 = fsa.add_transition(q0, b'z').unwrap();
    fsa.insert_transition(q0, b'a', q1).unwrap();
    fsa.insert_transition(q0, b'f', q2).unwrap();
    fsa.make_final(q2).unwrap();

    let states = fsa.iter_states().collect_vec();

    // ascending state index
    assert_eq!(states.len(), 3);
    assert_eq!(states[0].id, q0);
    assert_eq!(states[1].id, q1);
    assert_eq!(states[2].id, q2);

    assert!(!states[0].is_final);
    assert!(states[2].is_final);

    // ascending symbol within a state
    let symbols = states[0].transitions.keys().copied().collect_vec();
    assert_eq!(symbols, vec![b'a', b'f', b'z']);
    assert_eq!(states[0].transitions[&b'a'], q1);
    assert_eq!(states[0].transitions[&b'z'], q2);
}

#[test]
fn test_export_skips_free_slots() {
    let mut fsa = FiniteAutomaton::new();

    let _q0 = fsa.new_state().unwrap();
    let q1 = fsa.new_state().unwrap();
    let _q2 = fsa.new_state().unwrap();
    fsa.delete_state(q1).unwrap();

    let indices = fsa.iter_states().map(|s| s.id.index()).collect_vec();
    assert_eq!(indices, vec![0, 2]);
}

#[test]
fn test_export_serializes() {
    let mut fsa = FiniteAutomaton::new();

    let q0 = fsa.new_state().unwrap();
    let q1 = fsa.add_transition(q0, b'a').unwrap();
    fsa.make_final(q1).unwrap();

    let states = fsa.iter_states().collect_vec();
    let json = serde_json::to_value(&states).unwrap();

    let arr = json.as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["is_final"], false);
    assert_eq!(arr[1]["is_final"], true);
    assert_eq!(arr[0]["id"]["index"], 0);
    assert_eq!(arr[0]["transitions"][&b'a'.to_string()]["index"], 1);
}
