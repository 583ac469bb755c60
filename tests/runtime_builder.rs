mod common;

use common::{log, pending};
use deferred::{Deferred, Error, Resolution, Runtime, RuntimeBuilder, RuntimeError};

#[test]
fn test_builder_creation() {
    let rt = RuntimeBuilder::new().build();
    assert_eq!(rt.pending_tasks(), 0);
    drop(rt);

    let rt = RuntimeBuilder::default().queue_capacity(128).build();
    assert_eq!(rt.pending_tasks(), 0);
}

#[test]
fn test_builder_immediate_result() {
    let mut rt = RuntimeBuilder::new().build();
    let result = rt.block_on(async { 42 });

    assert_eq!(result, Ok(42), "Future should return correct value");
}

#[test]
fn test_builder_multiple_instances() {
    let mut rt1 = RuntimeBuilder::new().build();
    let mut rt2 = RuntimeBuilder::new().build();

    let result1 = rt1.block_on(async { Deferred::<i32>::resolved_with(10).await });
    let result2 = rt2.block_on(async { Deferred::<i32>::resolved_with(20).map(|v| v + 1).await });

    assert_eq!(result1, Ok(Ok(10)));
    assert_eq!(result2, Ok(Ok(21)));
}

#[test]
fn test_turn_limit_reports_runaway_chain() {
    let mut rt = RuntimeBuilder::new().turn_limit(5).build();

    let d = rt.enter(|| {
        let mut d = Deferred::<u32>::resolved_with(0);
        for _ in 0..10 {
            d = d.map(|v| v + 1);
        }
        d
    });

    assert_eq!(
        rt.run_until_idle(),
        Err(RuntimeError::TurnLimitExceeded { limit: 5 })
    );
    assert!(d.is_pending());
    assert_eq!(rt.pending_tasks(), 1, "Remaining work stays queued");

    assert_eq!(rt.run_until_idle(), Ok(5));
    assert_eq!(d.value(), Some(10));
}

#[test]
fn test_block_on_waits_for_settlement_from_another_chain() {
    let mut rt = Runtime::new();
    let (d, resolver) = pending::<String>();

    let out = rt.block_on(async move {
        Deferred::<u8>::resolved_with(1).map(move |_| resolver.fulfill("ready".to_string()));
        d.await
    });

    assert_eq!(out, Ok(Ok("ready".to_string())));
}

#[test]
fn test_block_on_surfaces_rejection_as_inner_err() {
    let mut rt = Runtime::new();

    let out = rt.block_on(async {
        let step = Deferred::<i32>::resolved_with(1).await.unwrap_or_default();
        Deferred::<i32>::resolved_with(step)
            .and_then(|_| -> Result<Resolution<i32>, Error> { Err(Error::from("step two")) })
            .await
    });

    assert_eq!(out, Ok(Err(Error::from("step two"))));
}

#[test]
fn test_block_on_stalls_on_pending_value() {
    let mut rt = Runtime::new();
    let (d, _resolver) = pending::<i32>();

    assert_eq!(rt.block_on(d.into_future()), Err(RuntimeError::Stalled));
    assert_eq!(rt.pending_tasks(), 0);
}

#[test]
fn test_run_returns_closure_value_after_draining() {
    let mut rt = Runtime::new();
    let seen = log();
    let s = seen.clone();

    let result = rt.run(|| {
        Deferred::<i32>::resolved_with(3).map(move |v| s.borrow_mut().push(v));
        "done"
    });

    assert_eq!(result, Ok("done"));
    assert_eq!(*seen.borrow(), vec![3]);
    assert_eq!(rt.pending_tasks(), 0);
}

#[test]
#[should_panic(expected = "deferred continuation scheduled outside of a runtime context")]
fn test_then_panics_outside_runtime() {
    Deferred::<i32>::resolved_with(1).map(|v| v + 1);
}
