//! End-to-end scenarios exercised against a direct in-process connection:
//! no transport, no serializer, just the realm/registration/subscription
//! tables and the RPC engine's cancel/timeout/streaming primitives wired
//! together by `wamp_core::DirectRouter`.

use wamp_core::rpc::{CancelMode, Outcome};
use wamp_core::{DirectRouter, MatchPolicy};

#[tokio::test]
async fn caller_identification_is_disclosed_to_the_callee() {
    let mut router = DirectRouter::new();
    let callee = router.join("realm1".into());
    let caller = router.join("realm1".into());

    let (_reg, mut inbox) = callee.register("rpc".into(), MatchPolicy::Exact).unwrap();
    let caller_id = caller.session_id;

    let callee_task = tokio::spawn(async move {
        let inv = inbox.recv().await.unwrap();
        assert_eq!(inv.caller_session, Some(caller_id));
        inv.send(Ok(Outcome::Final(None, None)));
    });

    let mut call = caller.call("rpc", None, None, true, 0).unwrap();
    let outcome = call.next().await.unwrap();
    assert!(outcome.is_final());
    callee_task.await.unwrap();
}

#[tokio::test]
async fn pattern_matching_routes_to_the_single_registered_handler() {
    let mut router = DirectRouter::new();
    let callee = router.join("realm1".into());
    let caller = router.join("realm1".into());

    let (_prefix_reg, mut prefix_inbox) = callee.register("com.myapp".into(), MatchPolicy::Prefix).unwrap();
    let (_wild_reg, mut wild_inbox) = callee.register("com.other..rpc".into(), MatchPolicy::Wildcard).unwrap();

    let prefix_hits = tokio::spawn(async move {
        let mut count = 0;
        while let Some(inv) = prefix_inbox.recv().await {
            count += 1;
            inv.send(Ok(Outcome::Final(None, None)));
            if count == 1 {
                break;
            }
        }
        count
    });
    let wild_hits = tokio::spawn(async move {
        let mut count = 0;
        while let Some(inv) = wild_inbox.recv().await {
            count += 1;
            inv.send(Ok(Outcome::Final(None, None)));
            if count == 1 {
                break;
            }
        }
        count
    });

    let mut call1 = caller.call("com.myapp.foo", None, None, false, 0).unwrap();
    assert!(call1.next().await.unwrap().is_final());

    let mut call2 = caller.call("com.other.foo.rpc", None, None, false, 0).unwrap();
    assert!(call2.next().await.unwrap().is_final());

    assert_eq!(prefix_hits.await.unwrap(), 1);
    assert_eq!(wild_hits.await.unwrap(), 1);
}

#[tokio::test]
async fn kill_mode_cancellation_interrupts_the_callee_once() {
    let mut router = DirectRouter::new();
    let callee = router.join("realm1".into());
    let caller = router.join("realm1".into());

    let (_reg, mut inbox) = callee.register("rpc".into(), MatchPolicy::Exact).unwrap();

    let callee_task = tokio::spawn(async move {
        let mut inv = inbox.recv().await.unwrap();
        let request = inv.request;
        let mode = (&mut inv.interrupt).await.unwrap();
        assert_eq!(mode, CancelMode::Kill);
        inv.send(Err(wamp_core::WampError::Cancelled(mode)));
        request
    });

    let mut call = caller.call("rpc", None, None, false, 0).unwrap();
    call.cancel(CancelMode::Kill);
    let err = call.next().await.unwrap_err();
    assert!(matches!(err, wamp_core::WampError::Cancelled(CancelMode::Kill)));

    callee_task.await.unwrap();

    // cancelling again after completion must be a no-op (no panic, no resend)
    call.cancel(CancelMode::Kill);
}

#[tokio::test]
async fn late_cancellation_on_a_completed_call_is_a_no_op() {
    let mut router = DirectRouter::new();
    let callee = router.join("realm1".into());
    let caller = router.join("realm1".into());

    let (_reg, mut inbox) = callee.register("rpc".into(), MatchPolicy::Exact).unwrap();
    tokio::spawn(async move {
        let inv = inbox.recv().await.unwrap();
        inv.send(Ok(Outcome::Final(None, None)));
    });

    let mut call = caller.call("rpc", None, None, false, 0).unwrap();
    let outcome = call.next().await.unwrap();
    assert!(outcome.is_final());

    // the call already completed; cancelling now must not error or panic,
    // and a subsequent call must still succeed normally
    call.cancel(CancelMode::Kill);

    let (_reg2, mut inbox2) = callee.register("rpc2".into(), MatchPolicy::Exact).unwrap();
    tokio::spawn(async move {
        let inv = inbox2.recv().await.unwrap();
        inv.send(Ok(Outcome::Final(Some(vec![42i64.into()]), None)));
    });
    let mut call2 = caller.call("rpc2", None, None, false, 0).unwrap();
    let outcome2 = call2.next().await.unwrap();
    assert!(outcome2.is_final());
}

#[tokio::test]
async fn callee_to_caller_streaming_delivers_chunks_in_order() {
    let mut router = DirectRouter::new();
    let callee = router.join("realm1".into());
    let caller = router.join("realm1".into());

    let (_reg, mut inbox) = callee.register("rpc".into(), MatchPolicy::Exact).unwrap();
    tokio::spawn(async move {
        let inv = inbox.recv().await.unwrap();
        let values = [9i64, 3, 7, 5];
        for (i, v) in values.iter().enumerate() {
            let args = Some(vec![(*v).into()]);
            if i + 1 == values.len() {
                inv.send(Ok(Outcome::Final(args, None)));
            } else {
                inv.send(Ok(Outcome::Progress(args, None)));
            }
        }
    });

    let mut call = caller.call("rpc", None, None, false, 0).unwrap();
    let mut seen = Vec::new();
    loop {
        let outcome = call.next().await.unwrap();
        let is_final = outcome.is_final();
        let (args, _) = outcome.into_parts();
        seen.push(args.unwrap()[0].as_i64().unwrap());
        if is_final {
            break;
        }
    }
    assert_eq!(seen, vec![9, 3, 7, 5]);
}

#[tokio::test]
async fn streaming_failure_on_the_final_chunk_surfaces_as_an_error() {
    let mut router = DirectRouter::new();
    let callee = router.join("realm1".into());
    let caller = router.join("realm1".into());

    let (_reg, mut inbox) = callee.register("rpc".into(), MatchPolicy::Exact).unwrap();
    tokio::spawn(async move {
        let inv = inbox.recv().await.unwrap();
        inv.send(Ok(Outcome::Progress(Some(vec![1i64.into()]), None)));
        inv.send(Err(wamp_core::WampError::ServerError(
            wamp_core::WampErrc::InvalidArgument,
            "wamp.error.invalid_argument".to_string(),
            Default::default(),
        )));
    });

    let mut call = caller.call("rpc", None, None, false, 0).unwrap();
    assert!(!call.next().await.unwrap().is_final());
    let err = call.next().await.unwrap_err();
    assert!(matches!(err, wamp_core::WampError::ServerError(wamp_core::WampErrc::InvalidArgument, ..)));
}

#[tokio::test]
async fn call_timeout_race_resolves_in_expiry_order() {
    let mut router = DirectRouter::new();
    let callee = router.join("realm1".into());
    let caller = router.join("realm1".into());

    let (_reg, mut inbox) = callee.register("rpc".into(), MatchPolicy::Exact).unwrap();
    let interrupt_order = std::sync::Arc::new(tokio::sync::Mutex::new(Vec::new()));
    let order_for_callee = interrupt_order.clone();

    let callee_task = tokio::spawn(async move {
        for _ in 0..3 {
            let mut inv = inbox.recv().await.unwrap();
            let request = inv.request;
            let order = order_for_callee.clone();
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(150)).await;
                if let Ok(mode) = (&mut inv.interrupt).try_recv() {
                    order.lock().await.push(request);
                    inv.send(Err(wamp_core::WampError::Cancelled(mode)));
                } else {
                    inv.send(Ok(Outcome::Final(inv.arguments.clone(), None)));
                }
            });
        }
    });

    let mut call1 = caller.call("rpc", Some(vec![1i64.into()]), None, false, 100).unwrap();
    let mut call2 = caller.call("rpc", Some(vec![2i64.into()]), None, false, 50).unwrap();
    let mut call3 = caller.call("rpc", Some(vec![3i64.into()]), None, false, 0).unwrap();

    let r1 = call1.next().await;
    let r2 = call2.next().await;
    let r3 = call3.next().await;

    assert!(matches!(r1.unwrap_err(), wamp_core::WampError::Cancelled(CancelMode::KillNoWait)));
    assert!(matches!(r2.unwrap_err(), wamp_core::WampError::Cancelled(CancelMode::KillNoWait)));
    let (args, _) = r3.unwrap().into_parts();
    assert_eq!(args.unwrap()[0].as_i64(), Some(3));

    callee_task.await.unwrap();
}
