use async_kernel::{prelude::*, testing::RecordingListener, SyncEventBus};

mod common;
use common::{get, kernel, routes};

#[test]
fn test_sync_handle_drives_the_pipeline() {
    let kernel = kernel(EventBus::default());

    let response = kernel.handle(get("/promise"), RequestKind::Main, true).unwrap();

    assert_eq!(response.body_text(), "Y");
}

#[test]
fn test_sync_handle_returns_errors() {
    let kernel = kernel(EventBus::default());

    let error = kernel
        .handle(get("/promise-exception"), RequestKind::Main, true)
        .unwrap_err();

    assert_eq!(error.to_string(), "E2");
}

#[tokio::test]
async fn test_dispatcher_without_async_capability_is_refused() {
    let recorder = RecordingListener::new();
    let bus = SyncEventBus::builder()
        .listen_sync::<RequestEvent, _>(0, recorder.clone())
        .listen_sync::<FinishRequestEvent, _>(0, recorder.clone())
        .build_sync();
    let kernel = Kernel::builder().dispatcher(bus).resolver(routes()).build();

    let error = kernel
        .handle_async(get("/value"), RequestKind::Main, true)
        .await
        .unwrap_err();

    assert!(matches!(error, KernelError::AsyncDispatcherNeeded));
    assert_eq!(recorder.count(), 0);
    assert!(kernel.request_stack().is_empty());
}

#[test]
fn test_sync_handle_refuses_sync_only_dispatcher() {
    let kernel = Kernel::builder()
        .dispatcher(SyncEventBus::default())
        .resolver(routes())
        .build();

    let error = kernel
        .handle(get("/value"), RequestKind::Main, true)
        .unwrap_err();

    assert_eq!(
        error.to_string(),
        "in order to use the async kernel, the event dispatcher must support asynchronous dispatch"
    );
}
