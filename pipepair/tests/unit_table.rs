use pipepair::{ExitStatus, Role, UnitTable};

async fn explode() -> i32 {
    panic!("unit blew up")
}

#[tokio::test]
async fn test_wait_returns_exit_code() {
    let table = UnitTable::new(4);
    let unit = table.spawn(Role::Producer, 0, |_pid| async { 7 }).unwrap();
    assert_eq!(table.live_count(), 1);

    assert_eq!(unit.wait().await.unwrap(), ExitStatus::Exited(7));
    assert_eq!(table.live_count(), 0);
}

#[tokio::test]
async fn test_pids_are_unique_and_increasing() {
    let table = UnitTable::new(4);
    let a = table.spawn(Role::Producer, 0, |_| async { 0 }).unwrap();
    let b = table.spawn(Role::Consumer, 0, |_| async { 0 }).unwrap();
    assert!(a.pid() < b.pid());
    assert_eq!(b.record().role, Role::Consumer);

    a.wait().await.unwrap();
    b.wait().await.unwrap();
}

#[tokio::test]
async fn test_body_sees_its_own_pid() {
    let table = UnitTable::new(1);
    let unit = table
        .spawn(Role::Consumer, 3, |pid| async move {
            i32::try_from(pid.id()).unwrap()
        })
        .unwrap();
    let expected = i32::try_from(unit.pid().id()).unwrap();
    assert_eq!(unit.wait().await.unwrap(), ExitStatus::Exited(expected));
}

#[tokio::test]
async fn test_spawn_refused_when_table_full() {
    let table = UnitTable::new(1);
    let first = table.spawn(Role::Producer, 0, |_| async { 0 }).unwrap();

    let err = table
        .spawn(Role::Consumer, 0, |_| async { 0 })
        .unwrap_err();
    assert_eq!(err.role, Role::Consumer);
    assert_eq!(err.limit, 1);

    // Reaping frees the slot
    first.wait().await.unwrap();
    assert!(table.spawn(Role::Consumer, 0, |_| async { 0 }).is_ok());
}

#[tokio::test]
async fn test_refused_body_is_never_built() {
    let table = UnitTable::new(0);
    let mut called = false;
    let result = table.spawn(Role::Producer, 0, |_| {
        called = true;
        async { 0 }
    });
    assert!(result.is_err());
    assert!(!called);
}

#[tokio::test]
async fn test_panicking_unit_exits_abnormally() {
    let table = UnitTable::new(1);
    let unit = table
        .spawn(Role::Producer, 0, |_| explode())
        .unwrap();

    let status = unit.wait().await.unwrap();
    assert_eq!(status, ExitStatus::Abnormal);
    assert!(!status.success());
    assert_eq!(status.code(), None);
}

#[tokio::test]
async fn test_cancelled_unit_is_a_wait_error() {
    let table = UnitTable::new(1);
    let unit = table
        .spawn(Role::Consumer, 0, |_| std::future::pending::<i32>())
        .unwrap();
    unit.abort();

    assert!(unit.wait().await.is_err());
    assert_eq!(table.live_count(), 0);
}

#[tokio::test]
async fn test_dropped_unit_releases_slot() {
    let table = UnitTable::new(1);
    let unit = table.spawn(Role::Producer, 0, |_| async { 0 }).unwrap();
    drop(unit);
    assert_eq!(table.live_count(), 0);
}
