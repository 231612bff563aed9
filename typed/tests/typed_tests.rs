// Integration tests for the typed facade

use typed::{
    Actor, ActorSystem, Context, ContextHandle, Error, InfoPart, MessageEnvelope,
    Pid, Props, ReceiverContext, ReceiverFunc, ReceiverMiddleware, SenderFunc,
    SenderMiddleware, SenderPart, SpawnerPart, Started, StopperPart, Supervisor,
    SupervisorStrategy, SupervisorStrategyFunc, Terminated,
};
use tokio::sync::mpsc;

use tracing_test::traced_test;

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

fn text(message: &typed::Message) -> Option<String> {
    message.downcast_ref::<String>().cloned()
}

fn current_text(ctx: &dyn Context) -> Option<String> {
    ctx.message().as_ref().and_then(text)
}

fn is_started(ctx: &dyn Context) -> bool {
    ctx.message().is_some_and(|message| message.is::<Started>())
}

fn echo() -> Props {
    Props::from_func(|ctx: &mut dyn Context| {
        if let Some(text) = current_text(ctx) {
            ctx.respond(Arc::new(text));
        }
    })
}

// Records the id of every target it sees.
fn recording(log: Arc<Mutex<Vec<String>>>) -> SenderMiddleware {
    Arc::new(move |next: SenderFunc| {
        let log = log.clone();
        Arc::new(
            move |handle: &ContextHandle, pid: &actor::Pid, envelope: MessageEnvelope| {
                log.lock().unwrap().push(pid.id().to_owned());
                next(handle, pid, envelope)
            },
        ) as SenderFunc
    })
}

#[tokio::test]
async fn test_addresses_remember_their_context() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let log = Arc::new(Mutex::new(vec![]));
    let (sender, mut receiver) = mpsc::unbounded_channel();
    let (received, mut deliveries) = mpsc::unbounded_channel();

    let child_props = Props::from_func(move |ctx: &mut dyn Context| {
        if let Some(text) = current_text(ctx) {
            let _ = received.send(text);
        }
    });
    let parent = root.spawn(
        &Props::from_func(move |ctx: &mut dyn Context| {
            if is_started(ctx) {
                let child = ctx.spawn(&child_props);
                let _ = sender.send((child, ctx.context_handle(), ctx.self_pid()));
            }
        })
        .with_sender_middleware([recording(log.clone())]),
    );
    assert!(parent.context().ptr_eq(&root.context_handle()));

    let (child, handle, self_pid) = receiver.recv().await.unwrap();
    assert!(child.context().ptr_eq(&handle));
    let self_pid = self_pid.unwrap();
    assert_eq!(self_pid, parent);
    assert!(self_pid.context().ptr_eq(&handle));

    // Telling the child from outside still runs the parent's sender middleware.
    child.tell(Arc::new("hello".to_owned()));
    assert_eq!(deliveries.recv().await, Some("hello".to_owned()));
    assert_eq!(*log.lock().unwrap(), vec![child.id().to_owned()]);

    // The same address seen by the root context does not.
    root.send(&child, Arc::new("direct".to_owned()));
    assert_eq!(deliveries.recv().await, Some("direct".to_owned()));
    assert_eq!(log.lock().unwrap().len(), 1);
}

// Middleware logging its tag for string messages and stopping the chain on "blocked".
fn tagging(
    tag: &'static str,
    log: Arc<Mutex<Vec<String>>>,
    blocks: bool,
) -> ReceiverMiddleware {
    Arc::new(move |next: ReceiverFunc| {
        let log = log.clone();
        Arc::new(
            move |ctx: &mut dyn ReceiverContext, envelope: MessageEnvelope| {
                let Some(content) = text(&envelope.message) else {
                    return next(ctx, envelope);
                };
                let view = if ctx.as_context().is_some() {
                    "full"
                } else {
                    "receiver"
                };
                log.lock().unwrap().push(format!("{}:{}:{}", tag, view, content));
                if blocks && content == "blocked" {
                    return;
                }
                next(ctx, envelope)
            },
        ) as ReceiverFunc
    })
}

#[tokio::test]
async fn test_receiver_middleware_runs_in_order() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let log = Arc::new(Mutex::new(vec![]));
    let actor_log = log.clone();

    let pid = root.spawn(
        &Props::from_func(move |ctx: &mut dyn Context| {
            if let Some(content) = current_text(ctx) {
                actor_log.lock().unwrap().push(format!("actor:{}", content));
                if ctx.sender().is_some() {
                    ctx.respond(Arc::new(()));
                }
            }
        })
        .with_receiver_middleware([
            tagging("m1", log.clone(), false),
            tagging("m2", log.clone(), true),
            tagging("m3", log.clone(), false),
        ]),
    );

    pid.tell(Arc::new("blocked".to_owned()));
    pid.request_future(Arc::new("open".to_owned()), Duration::from_secs(1))
        .wait()
        .await
        .unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "m1:full:blocked",
            "m2:full:blocked",
            "m1:full:open",
            "m2:full:open",
            "m3:full:open",
            "actor:open",
        ]
    );
}

// Reports every typed `Terminated` it receives.
fn watcher(
    target: Pid,
    ready: mpsc::UnboundedSender<()>,
    seen: mpsc::UnboundedSender<(Terminated, bool)>,
) -> Props {
    Props::from_func(move |ctx: &mut dyn Context| {
        let Some(message) = ctx.message() else {
            return;
        };
        if message.is::<Started>() {
            ctx.watch(&target);
            let _ = ready.send(());
        } else if let Some(terminated) = message.downcast_ref::<Terminated>() {
            let bound = terminated.who.context().ptr_eq(&ctx.context_handle());
            let _ = seen.send((terminated.clone(), bound));
        } else if message.is::<actor::Terminated>() {
            panic!("runtime Terminated reached typed code");
        }
    })
}

#[tokio::test]
async fn test_terminated_is_translated() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let (ready, mut readiness) = mpsc::unbounded_channel();
    let (seen, mut notifications) = mpsc::unbounded_channel();

    let target = root.spawn(&echo());
    let watching = root.spawn(&watcher(target.clone(), ready, seen));
    readiness.recv().await.unwrap();

    target.stop_future().wait().await.unwrap();
    let (terminated, bound) = notifications.recv().await.unwrap();
    assert_eq!(terminated.who, target);
    assert!(!terminated.address_terminated);
    assert!(bound);

    // A runtime notification sent as a plain message is translated too.
    let remote = actor::Pid::new("remote:8080", "gone");
    watching.tell(Arc::new(actor::Terminated {
        who: remote.clone(),
        address_terminated: true,
    }));
    let (terminated, bound) = notifications.recv().await.unwrap();
    assert_eq!(terminated.who.proto(), &remote);
    assert!(terminated.address_terminated);
    assert!(bound);
}

#[tokio::test]
async fn test_spawn_named_twice_fails() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let first = root.spawn_named(&echo(), "unique").unwrap();
    assert_eq!(first.id(), "unique");
    assert_eq!(
        root.spawn_named(&echo(), "unique").unwrap_err(),
        Error::NameExists("unique".to_owned())
    );
}

#[tokio::test]
async fn test_child_spawn_named_twice_fails() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let (sender, mut receiver) = mpsc::unbounded_channel();
    let parent = root.spawn(&Props::from_func(move |ctx: &mut dyn Context| {
        if is_started(ctx) {
            let first = ctx.spawn_named(&echo(), "dup").map(|pid| pid.id().to_owned());
            let second = ctx.spawn_named(&echo(), "dup").map(|pid| pid.id().to_owned());
            let _ = sender.send((first, second));
        }
    }));

    let (first, second) = receiver.recv().await.unwrap();
    let name = format!("{}/dup", parent.id());
    assert_eq!(first, Ok(name.clone()));
    assert_eq!(second, Err(Error::NameExists(name)));
}

#[tokio::test]
async fn test_request_times_out() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let silent = root.spawn(&Props::from_func(|_: &mut dyn Context| {}));

    let started = Instant::now();
    let result = silent
        .request_future(Arc::new("anyone?".to_owned()), Duration::from_millis(50))
        .result()
        .await;
    assert_eq!(result.unwrap_err(), Error::Timeout);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_millis(550));
}

#[tokio::test]
async fn test_request_reply() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let pid = root.spawn(&echo());
    let reply = pid
        .request_future(Arc::new("ping".to_owned()), Duration::from_secs(1))
        .result()
        .await
        .unwrap();
    assert_eq!(text(&reply), Some("ping".to_owned()));
}

struct Counter {
    count: Arc<AtomicUsize>,
}

impl Actor for Counter {
    fn receive(&mut self, ctx: &mut dyn Context) {
        if current_text(ctx).is_some() {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[tokio::test]
#[traced_test]
async fn test_graceful_stop_processes_queued_messages() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let count = Arc::new(AtomicUsize::new(0));
    let producer_count = count.clone();
    let pid = root.spawn(&Props::from_producer(move || {
        Box::new(Counter {
            count: producer_count.clone(),
        }) as Box<dyn Actor>
    }));

    for n in 0..5 {
        pid.tell(Arc::new(format!("message {}", n)));
    }
    pid.graceful_stop().await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 5);
    assert!(!system.proto().is_alive(pid.proto()));
    assert!(logs_contain("is stopping gracefully"));
}

#[tokio::test]
async fn test_stop_terminates_actor() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let pid = root.spawn(&echo());
    assert!(system.proto().is_alive(pid.proto()));
    root.stop_future(&pid).wait().await.unwrap();
    assert!(!system.proto().is_alive(pid.proto()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_skips_queued_messages() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let count = Arc::new(AtomicUsize::new(0));
    let actor_count = count.clone();
    let pid = root.spawn(&Props::from_func(move |ctx: &mut dyn Context| {
        if current_text(ctx).is_some() {
            std::thread::sleep(Duration::from_millis(20));
            actor_count.fetch_add(1, Ordering::SeqCst);
        }
    }));

    for n in 0..20 {
        pid.tell(Arc::new(format!("slow {}", n)));
    }
    let stopping = Instant::now();
    pid.stop();
    assert!(stopping.elapsed() < Duration::from_millis(20));

    tokio::time::timeout(Duration::from_secs(1), async {
        while system.proto().is_alive(pid.proto()) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert!(count.load(Ordering::SeqCst) < 20);
}

#[tokio::test]
async fn test_typed_supervisor_sees_bound_child() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let (failed, mut failures) = mpsc::unbounded_channel();
    let (terminated, mut terminations) = mpsc::unbounded_channel();
    let (spawned, mut children) = mpsc::unbounded_channel();

    let strategy: Arc<dyn SupervisorStrategy> = Arc::new(SupervisorStrategyFunc::new(
        move |_system: &ActorSystem,
              supervisor: &mut dyn Supervisor,
              child: &Pid,
              _stats: &typed::RestartStatistics,
              _reason: &typed::Reason,
              _message: Option<&typed::Message>| {
            let bound = child.context().ptr_eq(&supervisor.context_handle());
            let _ = failed.send((child.clone(), bound));
            supervisor.stop_children(&[child.proto().clone()]);
        },
    ));
    let fragile = Props::from_func(|ctx: &mut dyn Context| {
        if current_text(ctx).as_deref() == Some("boom") {
            panic!("boom");
        }
    });
    root.spawn(
        &Props::from_func(move |ctx: &mut dyn Context| {
            let Some(message) = ctx.message() else {
                return;
            };
            if message.is::<Started>() {
                let _ = spawned.send(ctx.spawn(&fragile));
            } else if let Some(notification) = message.downcast_ref::<Terminated>() {
                let _ = terminated.send(notification.who.clone());
            }
        })
        .with_supervisor(strategy),
    );

    let child = children.recv().await.unwrap();
    child.tell(Arc::new("boom".to_owned()));

    let (failed_child, bound) = failures.recv().await.unwrap();
    assert_eq!(failed_child, child);
    assert!(bound);
    assert_eq!(terminations.recv().await, Some(child));
}

struct Named {
    name: &'static str,
}

impl Actor for Named {
    fn receive(&mut self, ctx: &mut dyn Context) {
        if ctx.sender().is_some() {
            ctx.respond(Arc::new(ctx.actor().is_none()));
        }
    }
}

#[tokio::test]
async fn test_middleware_reaches_typed_actor() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let (sender, mut receiver) = mpsc::unbounded_channel();
    let inspect: ReceiverMiddleware = Arc::new(move |next: ReceiverFunc| {
        let sender = sender.clone();
        Arc::new(
            move |ctx: &mut dyn ReceiverContext, envelope: MessageEnvelope| {
                let name = ctx
                    .actor()
                    .and_then(|actor| actor.as_any().downcast_ref::<Named>())
                    .map(|named| named.name);
                let _ = sender.send(name);
                next(ctx, envelope)
            },
        ) as ReceiverFunc
    });

    let pid = root.spawn(
        &Props::from_producer(|| Box::new(Named { name: "named" }) as Box<dyn Actor>)
            .with_receiver_middleware([inspect]),
    );
    let hidden = pid
        .request_future(Arc::new(()), Duration::from_secs(1))
        .result()
        .await
        .unwrap();

    assert_eq!(receiver.recv().await, Some(Some("named")));
    assert_eq!(hidden.downcast_ref::<bool>(), Some(&true));
}

#[tokio::test]
#[traced_test]
async fn test_respond_without_sender_fails_the_actor() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let (sender, mut receiver) = mpsc::unbounded_channel();
    let pid = root.spawn(&Props::from_func(move |ctx: &mut dyn Context| {
        if is_started(ctx) {
            let _ = sender.send(());
        }
        if current_text(ctx).is_some() {
            ctx.respond(Arc::new("unreachable".to_owned()));
        }
    }));
    receiver.recv().await.unwrap();

    pid.tell(Arc::new("no sender".to_owned()));
    receiver.recv().await.unwrap();
    assert!(logs_contain("responded to a message without sender"));
}

#[tokio::test]
async fn test_children_are_bound_to_parent() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let (sender, mut receiver) = mpsc::unbounded_channel();
    root.spawn(&Props::from_func(move |ctx: &mut dyn Context| {
        if is_started(ctx) {
            let first = ctx.spawn_prefix(&echo(), "worker");
            let children = ctx.children();
            let handle = ctx.context_handle();
            let bound = children.iter().all(|child| child.context().ptr_eq(&handle));
            let _ = sender.send((first, children, bound));
        }
    }));

    let (first, children, bound) = receiver.recv().await.unwrap();
    assert_eq!(children, vec![first.clone()]);
    assert!(first.id().contains("/worker$"));
    assert!(bound);
}

#[tokio::test]
async fn test_parent_and_sender_are_bound() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let (sender, mut receiver) = mpsc::unbounded_channel();
    let (spawned, mut children) = mpsc::unbounded_channel();

    let child_props = Props::from_func(move |ctx: &mut dyn Context| {
        if current_text(ctx).is_none() {
            return;
        }
        let handle = ctx.context_handle();
        let parent = ctx.parent().unwrap();
        let requester = ctx.sender().unwrap();
        let _ = sender.send((
            parent.clone(),
            parent.context().ptr_eq(&handle),
            requester.context().ptr_eq(&handle),
        ));
        ctx.respond(Arc::new(()));
    });
    let parent = root.spawn(&Props::from_func(move |ctx: &mut dyn Context| {
        if is_started(ctx) {
            let _ = spawned.send(ctx.spawn(&child_props));
        }
    }));

    let child = children.recv().await.unwrap();
    child
        .request_future(Arc::new("who".to_owned()), Duration::from_secs(1))
        .wait()
        .await
        .unwrap();
    let (reported_parent, parent_bound, sender_bound) = receiver.recv().await.unwrap();
    assert_eq!(reported_parent, parent);
    assert!(parent_bound);
    assert!(sender_bound);
}
