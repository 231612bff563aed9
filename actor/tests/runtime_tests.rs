// Integration tests for the actor runtime

use actor::{
    Actor, ActorSystem, Context, Error, Props, ReceiveTimeout, SenderPart,
    SpawnerPart, Started, Stopped, StopperPart, Subscriber, SystemEvent,
    Terminated,
};
use async_trait::async_trait;
use tokio::sync::mpsc;

use tracing_test::traced_test;

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

fn text(ctx: &dyn Context) -> Option<String> {
    ctx.message()
        .and_then(|message| message.downcast_ref::<String>().cloned())
}

// Replies to every string with a prefixed copy.
fn echo() -> Props {
    Props::from_func(|ctx: &mut dyn Context| {
        if let Some(text) = text(ctx) {
            ctx.respond(Arc::new(format!("echo: {}", text)));
        }
    })
}

// Counts the strings it receives.
struct Counter {
    count: Arc<AtomicUsize>,
}

impl Actor for Counter {
    fn receive(&mut self, ctx: &mut dyn Context) {
        if text(ctx).is_some() {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[tokio::test]
#[traced_test]
async fn test_request_and_respond() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let pid = root.spawn(&echo());

    let reply = root
        .request_future(&pid, Arc::new("hi".to_owned()), Duration::from_secs(1))
        .result()
        .await
        .unwrap();
    assert_eq!(reply.downcast_ref::<String>().unwrap(), "echo: hi");
    assert!(logs_contain("is started"));
}

#[tokio::test]
async fn test_request_to_silent_actor_times_out() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let pid = root.spawn(&Props::from_func(|_: &mut dyn Context| {}));

    let started = std::time::Instant::now();
    let result = root
        .request_future(&pid, Arc::new(1u8), Duration::from_millis(50))
        .result()
        .await;
    assert_eq!(result.unwrap_err(), Error::Timeout);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_millis(550));
}

#[tokio::test]
async fn test_spawn_named_collision() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let first = root.spawn_named(&echo(), "dup").unwrap();
    assert_eq!(first.id(), "dup");
    assert_eq!(
        root.spawn_named(&echo(), "dup").unwrap_err(),
        Error::NameExists("dup".to_owned())
    );
    let prefixed = root.spawn_prefix(&echo(), "worker");
    assert!(prefixed.id().starts_with("worker$"));
}

#[tokio::test]
async fn test_children_are_named_after_parent_and_stopped_with_it() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let (sender, mut receiver) = mpsc::unbounded_channel();

    let parent = root.spawn(&Props::from_func(move |ctx: &mut dyn Context| {
        let started = ctx
            .message()
            .is_some_and(|message| message.is::<Started>());
        if started {
            let child = ctx.spawn_named(&echo(), "child").unwrap();
            ctx.watch(&child);
            let _ = sender.send((child, ctx.self_pid()));
        }
    }));

    let (child, reported_parent) = receiver.recv().await.unwrap();
    assert_eq!(child.id(), format!("{}/child", parent.id()));
    assert_eq!(reported_parent, Some(parent.clone()));

    let mut events = system.event_stream();
    root.stop_future(&parent).wait().await.unwrap();
    assert!(!system.is_alive(&child));
    assert!(!system.is_alive(&parent));

    let mut terminated = vec![];
    while terminated.len() < 2 {
        if let SystemEvent::ActorTerminated(who) = events.recv().await.unwrap() {
            terminated.push(who);
        }
    }
    assert_eq!(terminated, vec![child, parent]);
}

#[tokio::test]
async fn test_poison_future_drains_queue_first() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let count = Arc::new(AtomicUsize::new(0));
    let producer_count = count.clone();
    let pid = root.spawn(&Props::from_producer(move || {
        Box::new(Counter {
            count: producer_count.clone(),
        }) as Box<dyn Actor>
    }));

    for n in 0..3 {
        root.send(&pid, Arc::new(format!("message {}", n)));
    }
    root.poison_future(&pid).wait().await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 3);
    assert!(!system.is_alive(&pid));
}

#[tokio::test]
async fn test_watchers_receive_terminated() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let (sender, mut receiver) = mpsc::unbounded_channel();
    let target = root.spawn(&echo());
    let watched = target.clone();

    root.spawn(&Props::from_func(move |ctx: &mut dyn Context| {
        let Some(message) = ctx.message() else {
            return;
        };
        if message.is::<Started>() {
            ctx.watch(&watched);
        } else if let Some(terminated) = message.downcast_ref::<Terminated>() {
            let _ = sender.send(terminated.who.clone());
        }
    }));

    tokio::time::sleep(Duration::from_millis(20)).await;
    root.stop(&target);
    assert_eq!(receiver.recv().await, Some(target));
}

#[tokio::test]
async fn test_watching_a_dead_process_answers_terminated() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let (sender, mut receiver) = mpsc::unbounded_channel();
    let ghost = actor::Pid::new("nonhost", "ghost");
    let watched = ghost.clone();

    root.spawn(&Props::from_func(move |ctx: &mut dyn Context| {
        let Some(message) = ctx.message() else {
            return;
        };
        if message.is::<Started>() {
            ctx.watch(&watched);
        } else if let Some(terminated) = message.downcast_ref::<Terminated>() {
            let _ = sender.send(terminated.who.clone());
        }
    }));
    assert_eq!(receiver.recv().await, Some(ghost));
}

#[tokio::test]
async fn test_receive_timeout() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let (sender, mut receiver) = mpsc::unbounded_channel();

    root.spawn(&Props::from_func(move |ctx: &mut dyn Context| {
        let Some(message) = ctx.message() else {
            return;
        };
        if message.is::<Started>() {
            ctx.set_receive_timeout(Duration::from_millis(20));
        } else if message.is::<ReceiveTimeout>() {
            let _ = sender.send(ctx.receive_timeout());
        }
    }));

    let fired = tokio::time::timeout(Duration::from_secs(1), receiver.recv())
        .await
        .unwrap();
    assert_eq!(fired, Some(Duration::from_millis(20)));
}

#[tokio::test]
async fn test_await_future_restores_message() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let (sender, mut receiver) = mpsc::unbounded_channel();
    let target = root.spawn(&echo());

    let asker = root.spawn(&Props::from_func(move |ctx: &mut dyn Context| {
        if text(ctx).as_deref() != Some("ask") {
            return;
        }
        let future = ctx.request_future(
            &target,
            Arc::new("ping".to_owned()),
            Duration::from_secs(1),
        );
        let sender = sender.clone();
        ctx.await_future(
            future,
            Box::new(move |ctx: &mut dyn Context, result| {
                let reply = result
                    .ok()
                    .and_then(|reply| reply.downcast_ref::<String>().cloned());
                let _ = sender.send((text(ctx), reply));
            }),
        );
    }));

    root.send(&asker, Arc::new("ask".to_owned()));
    assert_eq!(
        receiver.recv().await,
        Some((Some("ask".to_owned()), Some("echo: ping".to_owned())))
    );
}

#[tokio::test]
async fn test_sender_is_set_by_request() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let (sender, mut receiver) = mpsc::unbounded_channel();
    let target = root.spawn(&Props::from_func(move |ctx: &mut dyn Context| {
        if text(ctx).is_some() {
            let _ = sender.send(ctx.sender());
        }
    }));

    let requester = root.spawn(&echo());
    root.request_with_custom_sender(&target, Arc::new("who".to_owned()), &requester);
    assert_eq!(receiver.recv().await, Some(Some(requester)));

    root.send(&target, Arc::new("nobody".to_owned()));
    assert_eq!(receiver.recv().await, Some(None));
}

#[tokio::test]
#[traced_test]
async fn test_messages_to_stopped_actor_are_dead_letters() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let pid = root.spawn(&echo());
    root.stop_future(&pid).wait().await.unwrap();

    let result = root
        .request_future(&pid, Arc::new("late".to_owned()), Duration::from_secs(1))
        .result()
        .await;
    assert_eq!(result.unwrap_err(), Error::DeadLetter(pid));
    assert!(logs_contain("was delivered to dead letters"));
}

struct Forward(mpsc::UnboundedSender<SystemEvent>);

#[async_trait]
impl Subscriber<SystemEvent> for Forward {
    async fn notify(&self, event: SystemEvent) {
        let _ = self.0.send(event);
    }
}

#[tokio::test]
async fn test_subscriber_sees_dead_letters() {
    let system = ActorSystem::default();
    let (sender, mut receiver) = mpsc::unbounded_channel();
    system.subscribe(Forward(sender));
    tokio::task::yield_now().await;

    let target = actor::Pid::new("nonhost", "nobody");
    system.root().send(&target, Arc::new(9u32));

    match receiver.recv().await.unwrap() {
        SystemEvent::DeadLetter(event) => {
            assert_eq!(event.pid, target);
            assert_eq!(event.message.downcast_ref::<u32>(), Some(&9));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_stopping_and_stopped_are_delivered() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let (sender, mut receiver) = mpsc::unbounded_channel();
    let pid = root.spawn(&Props::from_func(move |ctx: &mut dyn Context| {
        if ctx.message().is_some_and(|message| message.is::<Stopped>()) {
            let _ = sender.send(ctx.self_pid());
        }
    }));

    root.stop_future(&pid).wait().await.unwrap();
    assert_eq!(receiver.recv().await, Some(Some(pid)));
}

#[tokio::test]
async fn test_system_shutdown_stops_every_actor() {
    let system = ActorSystem::default();
    let mut root = system.root();
    let first = root.spawn(&echo());
    let second = root.spawn(&echo());

    let mut events = system.event_stream();
    system.shutdown();
    let mut terminated = vec![];
    while terminated.len() < 2 {
        if let SystemEvent::ActorTerminated(who) = events.recv().await.unwrap() {
            terminated.push(who);
        }
    }
    assert!(terminated.contains(&first));
    assert!(terminated.contains(&second));
    assert!(system.is_shutdown());
}

#[test]
fn test_actor_is_hidden_from_itself() {
    let seen = Arc::new(AtomicUsize::new(0));
    let inner_seen = seen.clone();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async move {
        let system = ActorSystem::default();
        let mut root = system.root();
        let pid = root.spawn(&Props::from_func(move |ctx: &mut dyn Context| {
            if text(ctx).is_some() && ctx.actor().is_none() {
                inner_seen.fetch_add(1, Ordering::SeqCst);
            }
            if text(ctx).is_some() {
                ctx.respond(Arc::new(()));
            }
        }));
        root.request_future(&pid, Arc::new("ping".to_owned()), Duration::from_secs(1))
            .wait()
            .await
            .unwrap();
    });
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}
