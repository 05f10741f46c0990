/// Integration tests for the state file
///
/// A saved server must come back with the same users, the same tables and
/// an id sequence that keeps counting from where it stopped.
use std::path::PathBuf;
use uuid::Uuid;
use vpoker::table::Class;
use vpoker::{StateError, StateFile, TableRegistry, UserRegistry};

fn temp_state_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("vpoker-it-{}", Uuid::new_v4()))
        .join("vpoker.json")
}

#[tokio::test]
async fn test_save_then_load_restores_everything() {
    let users = UserRegistry::new();
    let tables = TableRegistry::new(2);

    let alice = users.register("alice").await;
    let bob = users.register("bob").await;
    let table = tables.create().await.unwrap();
    table.join_and_announce(&alice).await.unwrap();
    table.join_and_announce(&bob).await.unwrap();
    let card = table.read_lock(|t| Ok(t.items.as_slice()[0].id)).unwrap();
    table.take_card(&alice.id, card).await.unwrap();

    let file = StateFile::new(temp_state_path());
    file.save(&users, &tables).await.unwrap();

    let saved = file.load().await.unwrap();
    assert_eq!(saved.users.len(), 2);
    assert_eq!(saved.users.get(&alice.id), Some(&alice));

    let restored = saved.tables.get(&table.id()).unwrap();
    let original = table.deep_copy();
    let copy = restored.deep_copy();
    assert_eq!(copy.items, original.items);
    assert_eq!(copy.roster(), original.roster());
    assert_eq!(copy.last_id(), original.last_id());
    assert!(copy.items.get(card).unwrap().is_owned_by(&alice.id));
}

#[tokio::test]
async fn test_restored_table_keeps_counting_ids() {
    let users = UserRegistry::new();
    let tables = TableRegistry::new(1);
    let table = tables.create().await.unwrap();
    let last_id = table.read_lock(|t| Ok(t.last_id())).unwrap();

    let file = StateFile::new(temp_state_path());
    file.save(&users, &tables).await.unwrap();
    let saved = file.load().await.unwrap();

    let restored = TableRegistry::from_tables(saved.tables, 1);
    let table = restored.get(&table.id()).await.unwrap();
    let carol = users.register("carol").await;
    let items = table.join_and_announce(&carol).await.unwrap();

    assert_eq!(items[0].id, last_id + 1);
    assert!(items[0].is(Class::Player));
}

#[tokio::test]
async fn test_restored_players_have_no_subscribers() {
    let users = UserRegistry::new();
    let tables = TableRegistry::new(1);
    let alice = users.register("alice").await;
    let table = tables.create().await.unwrap();
    table.join_and_announce(&alice).await.unwrap();
    let (tx, _rx) = vpoker::table::push::channel();
    table.subscribe(&alice.id, tx).unwrap();

    let file = StateFile::new(temp_state_path());
    file.save(&users, &tables).await.unwrap();
    let saved = file.load().await.unwrap();

    let restored = saved.tables.get(&table.id()).unwrap();
    restored
        .read_lock(|t| {
            assert!(!t.player(&alice.id).unwrap().is_subscribed());
            Ok(())
        })
        .unwrap();
}

#[tokio::test]
async fn test_second_save_replaces_first() {
    let users = UserRegistry::new();
    let tables = TableRegistry::new(1);
    let file = StateFile::new(temp_state_path());

    users.register("alice").await;
    file.save(&users, &tables).await.unwrap();
    users.register("bob").await;
    tables.create().await.unwrap();
    file.save(&users, &tables).await.unwrap();

    let saved = file.load().await.unwrap();
    assert_eq!(saved.users.len(), 2);
    assert_eq!(saved.tables.len(), 1);
    let dir = file.path().parent().unwrap();
    let leftovers: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path != file.path())
        .collect();
    assert!(leftovers.is_empty(), "temporary files left behind: {leftovers:?}");
}

#[tokio::test]
async fn test_overlapping_saves_both_succeed() {
    let users = UserRegistry::new();
    let tables = TableRegistry::new(1);
    users.register("alice").await;
    tables.create().await.unwrap();
    let file = StateFile::new(temp_state_path());

    let (first, second) = tokio::join!(file.save(&users, &tables), file.save(&users, &tables));
    first.unwrap();
    second.unwrap();

    let saved = file.load().await.unwrap();
    assert_eq!(saved.users.len(), 1);
    assert_eq!(saved.tables.len(), 1);
}

/// Save one seated player, then rewrite the saved tables line with `tamper`.
async fn tampered_file(tamper: impl FnOnce(&mut serde_json::Value, &str)) -> StateFile {
    let users = UserRegistry::new();
    let tables = TableRegistry::new(1);
    let alice = users.register("alice").await;
    let table = tables.create().await.unwrap();
    table.join_and_announce(&alice).await.unwrap();

    let file = StateFile::new(temp_state_path());
    file.save(&users, &tables).await.unwrap();

    let contents = tokio::fs::read_to_string(file.path()).await.unwrap();
    let mut lines = contents.lines();
    let users_line = lines.next().unwrap().to_string();
    let mut saved_tables: serde_json::Value = serde_json::from_str(lines.next().unwrap()).unwrap();
    let saved_table = &mut saved_tables[table.id().to_string()];
    tamper(saved_table, &alice.id.to_string());

    tokio::fs::write(file.path(), format!("{users_line}\n{saved_tables}\n"))
        .await
        .unwrap();
    file
}

#[tokio::test]
async fn test_load_rejects_seat_out_of_range() {
    let file = tampered_file(|table, alice| table["players"][alice]["index"] = 7.into()).await;
    let err = file.load().await.unwrap_err();
    assert!(matches!(err, StateError::Corrupt(_)), "{err}");
}

#[tokio::test]
async fn test_load_rejects_missing_marker() {
    let file = tampered_file(|table, _| {
        table["items"]
            .as_array_mut()
            .unwrap()
            .retain(|item| item["class"] != "player");
    })
    .await;
    let err = file.load().await.unwrap_err();
    assert!(matches!(err, StateError::Corrupt(_)), "{err}");
}

#[tokio::test]
async fn test_load_rejects_card_held_by_stranger() {
    let stranger = Uuid::new_v4().to_string();
    let file = tampered_file(|table, _| table["items"][0]["owner_id"] = stranger.into()).await;
    let err = file.load().await.unwrap_err();
    assert!(matches!(err, StateError::Corrupt(_)), "{err}");
}
