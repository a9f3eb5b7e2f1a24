use kbpe::{Codec, KbpeError, StopReason, Trainer, TrainerConfig, VocabFormat};
use tempfile::tempdir;

fn quiet_trainer(kmer_size: usize) -> Trainer {
    let cfg = TrainerConfig::builder()
        .kmer_size(kmer_size)
        .show_progress(false)
        .build()
        .expect("valid config");
    Trainer::new(cfg)
}

fn training_sequence() -> String {
    // Repetitive motifs give the trainer high-frequency pairs to merge.
    "ACGTACGTAAGGTTACGT"
        .chars()
        .cycle()
        .take(2_000)
        .collect()
}

#[test]
fn train_save_load_serves_both_formats() {
    let workspace = tempdir().expect("tempdir");
    let json_path = workspace.path().join("dna.json");
    let model_path = workspace.path().join("dna.model");

    let mut trainer = quiet_trainer(4);
    let metrics = trainer
        .train(&training_sequence(), 300, 10)
        .expect("training");
    assert!(metrics.merge_count > 0);
    assert!(trainer.vocabulary().len() <= 300);

    trainer.save(&json_path, VocabFormat::Json).expect("save json");
    trainer
        .save(&model_path, VocabFormat::Binary)
        .expect("save binary");

    let from_json = Codec::from_path(&json_path).expect("load json");
    let from_binary = Codec::from_path(&model_path).expect("load binary");
    assert_eq!(
        from_json.vocabulary().base_tokens(),
        from_binary.vocabulary().base_tokens()
    );
    assert_eq!(
        from_json.vocabulary().merged_tokens(),
        from_binary.vocabulary().merged_tokens()
    );

    let sample = "ACGTACGTAAGGTTAC";
    let ids_json = from_json.encode(sample).expect("encode");
    let ids_binary = from_binary.encode(sample).expect("encode");
    assert_eq!(ids_json, ids_binary);
    assert_eq!(from_json.decode(&ids_json), from_binary.decode(&ids_binary));
}

#[test]
fn untrained_vocabulary_round_trips_through_disk() {
    let workspace = tempdir().expect("tempdir");
    let path = workspace.path().join("base.json");

    let trainer = Trainer::with_kmer_size(2).expect("trainer");
    trainer.save(&path, VocabFormat::Json).expect("save");

    let codec = Codec::from_path(&path).expect("load");
    let ids = codec.encode("ACGT").expect("encode");
    assert_eq!(ids, vec![1, 6, 11]);
    assert_eq!(codec.decode(&ids), "ACGT");
}

#[test]
fn trained_vocabulary_still_round_trips_base_streams() {
    let mut trainer = quiet_trainer(2);
    trainer
        .train(&training_sequence(), 24, 4)
        .expect("training");
    let codec = Codec::new(trainer.into_vocabulary()).expect("codec");

    let sample = "ACGTACGTACGTGTACCAGT";
    let ids = codec.encode(sample).expect("encode");
    assert_eq!(codec.decode(&ids), sample);
}

#[test]
fn continuous_vocabulary_resolves_remainder_tokens() {
    // With base ids for every length 1..=k, an odd-length sequence's trailing
    // one-character token maps to a real base id instead of the fallback.
    let cfg = TrainerConfig::builder()
        .kmer_size(2)
        .continuous(true)
        .show_progress(false)
        .build()
        .expect("valid config");
    let mut trainer = Trainer::new(cfg);
    assert_eq!(trainer.vocabulary().base_len(), 20);
    trainer
        .train(&training_sequence(), 40, 4)
        .expect("training");

    let codec = Codec::new(trainer.into_vocabulary()).expect("codec");
    let sample = "ACGTA";
    let (ids, oov) = codec.encode_with_oov(sample).expect("encode");
    assert_eq!(oov, 0);
    // Singles occupy ids 0..4, pairs follow: AC = 5, CG = 10, GT = 15,
    // TA = 16, remainder "A" = 0.
    assert_eq!(ids, vec![5, 10, 15, 16, 0]);
    assert_eq!(codec.decode(&ids), sample);
}

#[test]
fn encode_surfaces_invalid_symbols() {
    let mut trainer = quiet_trainer(2);
    trainer
        .train(&training_sequence(), 20, 2)
        .expect("training");
    let codec = Codec::new(trainer.into_vocabulary()).expect("codec");
    let err = codec.encode("ACGX").expect_err("X is invalid");
    assert!(matches!(err, KbpeError::InvalidSymbol { symbol: 'X', .. }));
}

#[test]
fn unsupported_extension_is_rejected_on_load() {
    let workspace = tempdir().expect("tempdir");
    let path = workspace.path().join("dna.txt");
    std::fs::write(&path, "{}").expect("write");
    let err = Codec::from_path(&path).expect_err("txt is unsupported");
    assert!(matches!(err, KbpeError::UnsupportedFormat(_)));
}

#[test]
fn partial_convergence_is_a_valid_terminal_state() {
    // A tiny sequence exhausts its mergeable pairs long before an oversized
    // target, which must terminate cleanly rather than error.
    let mut trainer = quiet_trainer(2);
    let metrics = trainer
        .train("ACGTACGTACGT", 10_000, 16)
        .expect("training");
    assert_eq!(metrics.stop_reason, StopReason::NoEligiblePairs);
    assert!(trainer.vocabulary().len() < 10_000);
    assert_eq!(
        metrics.merge_count,
        trainer.vocabulary().merged_len()
    );
}
