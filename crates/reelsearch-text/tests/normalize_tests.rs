use reelsearch_text::Normalizer;

#[test]
fn lowercases_strips_punctuation_and_stems() {
    let n = Normalizer::default();
    assert_eq!(n.normalize("The Cats, the CATS!"), vec!["cat".to_string()]);
    assert_eq!(n.normalize("running"), vec!["run".to_string()]);
}

#[test]
fn repeated_words_contribute_once() {
    let n = Normalizer::default();
    assert_eq!(n.normalize("jumps jumps jumps"), vec!["jump".to_string()]);
}

#[test]
fn punctuation_inside_words_is_removed_not_split() {
    let n = Normalizer::default();
    let tokens = n.normalize("don't");
    assert_eq!(tokens.len(), 1);
    assert!(tokens[0].starts_with("dont"), "got {tokens:?}");
}

#[test]
fn custom_stopwords_replace_defaults() {
    let n = Normalizer::new(vec!["space".to_string()]);
    assert_eq!(n.normalize("space cats"), vec!["cat".to_string()]);
    // "the" is only a stopword in the default list
    assert!(n.normalize("the").len() == 1);
}

#[test]
fn stopwords_file_is_read_line_by_line() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("stopwords.txt");
    std::fs::write(&path, "Space\n\n  cats \n").unwrap();
    let n = Normalizer::from_stopwords_file(&path).expect("load stopwords");
    assert!(n.normalize("space cats").is_empty());
}

#[test]
fn blank_and_punctuation_only_text_yields_nothing() {
    let n = Normalizer::default();
    assert!(n.normalize("").is_empty());
    assert!(n.normalize("  ... !! ").is_empty());
    assert!(n.normalize("the and of").is_empty());
}

#[test]
fn output_is_sorted_and_deterministic() {
    let n = Normalizer::default();
    let a = n.normalize("zebra apple mango");
    let b = n.normalize("mango zebra apple");
    assert_eq!(a, b);
    let mut sorted = a.clone();
    sorted.sort();
    assert_eq!(a, sorted);
}
