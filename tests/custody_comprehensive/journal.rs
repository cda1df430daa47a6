//! Journal tests
//!
//! Durable ledgers replay their journal on open; a torn tail is dropped,
//! corruption earlier in the file fails the open.

use crate::*;
use std::fs::OpenOptions;
use std::io::Write;

#[test]
fn test_reopen_restores_every_unit() {
    let dir = tempfile::tempdir().unwrap();
    let (batch, product, journey) = {
        let db = Verdant::open(dir.path()).unwrap();
        let b1 = received_batch(&db, ashwagandha());
        lab_report(&db, &b1, "R1");
        let p1 = db.products.aggregate("Powder", [b1], processor()).unwrap().id();
        db.products.package(&p1, Some("LOT-9".into()), processor()).unwrap();
        let journey = db.journeys.resolve(&p1.token()).unwrap();
        (b1, p1, journey)
    };

    let db = Verdant::open(dir.path()).unwrap();
    assert_eq!(db.batches.get(&batch).unwrap().status(), UnitStatus::Consumed);
    assert_eq!(db.products.get(&product).unwrap().status(), UnitStatus::Packaged);
    assert_eq!(db.products.sources(&product).unwrap(), vec![batch]);
    assert_eq!(db.journeys.resolve(&product.token()).unwrap(), journey);
}

#[test]
fn test_reopen_keeps_idempotency_keys() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let db = Verdant::open(dir.path()).unwrap();
        let id = db.batches.create(ashwagandha()).unwrap().id();
        db.batches
            .receive_with(&id, Submission::by(dealer()).idempotent(key("rx-9")))
            .unwrap();
        id
    };

    let db = Verdant::open(dir.path()).unwrap();
    let retry = db
        .batches
        .receive_with(&id, Submission::by(dealer()).idempotent(key("rx-9")))
        .unwrap();
    assert!(retry.is_duplicate());
    assert_eq!(db.batches.get(&id).unwrap().history().len(), 2);
}

#[test]
fn test_rejected_operations_leave_no_trace() {
    let dir = tempfile::tempdir().unwrap();
    let journal = dir.path().join("custody.journal");
    let db = Verdant::open(dir.path()).unwrap();
    let id = db.batches.create(ashwagandha()).unwrap().id();
    let size = std::fs::metadata(&journal).unwrap().len();

    assert!(db.products.aggregate("Powder", [id], processor()).is_err());
    assert!(db.batches.transfer(&id, grower(), dealer()).is_ok());
    assert!(db.batches.transfer(&id, grower(), dealer()).is_err());
    drop(db);

    let grown = std::fs::metadata(&journal).unwrap().len();
    assert!(grown > size);
    let db = Verdant::open(dir.path()).unwrap();
    assert_eq!(db.batches.get(&id).unwrap().history().len(), 2);
    assert_eq!(db.version(), 2);
}

#[test]
fn test_torn_tail_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let db = Verdant::open(dir.path()).unwrap();
        db.batches.create(ashwagandha()).unwrap().id()
    };
    let mut file = OpenOptions::new()
        .append(true)
        .open(dir.path().join("custody.journal"))
        .unwrap();
    file.write_all(b"0badc0de {\"version\":2,\"committed").unwrap();
    drop(file);

    let db = Verdant::open(dir.path()).unwrap();
    assert_eq!(db.batches.list().unwrap().len(), 1);
    assert_eq!(db.batches.get(&id).unwrap().status(), UnitStatus::Created);

    // The ledger keeps working after the truncation
    db.batches.receive(&id, dealer()).unwrap();
    drop(db);
    let db = Verdant::open(dir.path()).unwrap();
    assert_eq!(db.batches.get(&id).unwrap().status(), UnitStatus::Received);
}

#[test]
fn test_corruption_before_tail_fails_open() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = Verdant::open(dir.path()).unwrap();
        let id = db.batches.create(ashwagandha()).unwrap().id();
        db.batches.receive(&id, dealer()).unwrap();
    }
    let path = dir.path().join("custody.journal");
    let content = std::fs::read_to_string(&path).unwrap();
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
    assert_eq!(lines.len(), 2);
    lines[0] = lines[0].replacen("Ashwagandha", "Ashwagandhx", 1);
    std::fs::write(&path, lines.join("\n") + "\n").unwrap();

    let err = Verdant::open(dir.path()).unwrap_err();
    assert_eq!(err.code(), "storage");
}

#[test]
fn test_strict_mode_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("verdant.toml");
    let journal = dir.path().join("data").join("ledger.journal");
    std::fs::write(
        &config_path,
        format!(
            "[ledger]\njournal_path = {:?}\ndurability = \"strict\"\n\n[tracking]\nhost = \"trace.example.org\"\n",
            journal.display().to_string()
        ),
    )
    .unwrap();

    let db = Verdant::from_config_file(&config_path).unwrap();
    assert_eq!(db.config().ledger.durability, Durability::Strict);
    assert_eq!(db.journal_path(), Some(journal.as_path()));
    let id = db.batches.create(ashwagandha()).unwrap().id();
    assert!(db.journeys.tracking_url(&id).starts_with("https://trace.example.org/track/"));
    assert!(journal.exists());
}
