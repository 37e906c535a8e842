// Shared relay bootstrap and presentation double for client integration tests.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, OnceLock},
    time::Duration,
};
use sync_client::{
    ClientSyncAgent, Presentation,
    interface_adapters::{LinkSettings, connect},
};
use sync_protocol::{ParticipantId, PositionSample, identity};

static SERVER_ADDR: OnceLock<String> = OnceLock::new();
static SERVER_READY: OnceLock<()> = OnceLock::new();

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

// Ensure the relay is running and return its host:port.
pub fn ensure_server() -> &'static str {
    SERVER_READY.get_or_init(|| {
        let published_addr = Arc::new(OnceLock::<String>::new());
        let published_addr_thread = Arc::clone(&published_addr);
        // The relay outlives individual `#[tokio::test]` runtimes on its own thread.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_addr_thread.set(addr.to_string());
                relay_server::run(listener).await.expect("relay failed");
            });
        });

        let addr = loop {
            if let Some(addr) = published_addr.get() {
                break addr.clone();
            }
            std::thread::sleep(Duration::from_millis(10));
        };
        let _ = SERVER_ADDR.set(addr.clone());

        for _ in 0..100 {
            if std::net::TcpStream::connect(&addr).is_ok() {
                return;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        panic!("relay did not become ready in time");
    });

    SERVER_ADDR
        .get()
        .expect("server addr should be initialized")
        .as_str()
}

pub fn ws_url() -> String {
    format!("ws://{}/ws", ensure_server())
}

// Scripted scene: tests set velocity and sample directly.
#[derive(Debug)]
pub struct ScriptedScene {
    pub velocity: (f32, f32),
    pub sample: PositionSample,
    pub remote: HashMap<u32, (ParticipantId, PositionSample)>,
    pub created: Vec<(ParticipantId, PositionSample)>,
    pub destroyed: Vec<ParticipantId>,
    pub disconnects: u32,
    next_handle: u32,
}

impl ScriptedScene {
    pub fn new() -> Self {
        Self {
            velocity: (0.0, 0.0),
            sample: PositionSample::new(0.0, 0.0, 0),
            remote: HashMap::new(),
            created: Vec::new(),
            destroyed: Vec::new(),
            disconnects: 0,
            next_handle: 0,
        }
    }

    pub fn move_to(&mut self, sample: PositionSample) {
        self.velocity = (1.0, 0.0);
        self.sample = sample;
    }

    pub fn stop(&mut self) {
        self.velocity = (0.0, 0.0);
    }

    pub fn sees(&self, id: &ParticipantId) -> Option<PositionSample> {
        self.remote
            .values()
            .find(|(remote_id, _)| remote_id == id)
            .map(|(_, sample)| *sample)
    }
}

impl Presentation for ScriptedScene {
    type Handle = u32;

    fn local_velocity(&self) -> (f32, f32) {
        self.velocity
    }

    fn local_sample(&self) -> PositionSample {
        self.sample
    }

    fn create_remote_entity(&mut self, id: &ParticipantId, sample: &PositionSample) -> u32 {
        self.next_handle += 1;
        self.remote.insert(self.next_handle, (id.clone(), *sample));
        self.created.push((id.clone(), *sample));
        self.next_handle
    }

    fn update_remote_entity(&mut self, handle: &mut u32, sample: &PositionSample) {
        if let Some(entry) = self.remote.get_mut(handle) {
            entry.1 = *sample;
        }
    }

    fn is_handle_valid(&self, handle: &u32) -> bool {
        self.remote.contains_key(handle)
    }

    fn destroy_remote_entity(&mut self, handle: u32) {
        if let Some((id, _)) = self.remote.remove(&handle) {
            self.destroyed.push(id);
        }
    }

    fn on_disconnected(&mut self) {
        self.disconnects += 1;
    }
}

pub struct Participant {
    pub agent: ClientSyncAgent<u32>,
    pub scene: ScriptedScene,
}

impl Participant {
    pub async fn join() -> Self {
        let link = connect(
            &ws_url(),
            LinkSettings {
                outbound_capacity: 16,
                inbound_capacity: 64,
            },
        )
        .await
        .expect("connect to relay");

        Self {
            agent: ClientSyncAgent::new(identity::generate(), link),
            scene: ScriptedScene::new(),
        }
    }

    pub fn id(&self) -> ParticipantId {
        self.agent.local_id().clone()
    }

    pub fn tick(&mut self) {
        self.agent.tick(&mut self.scene);
    }

    // Tick until `done` holds; other tests share the relay, so unrelated tables may arrive.
    pub async fn tick_until(&mut self, done: impl Fn(&ScriptedScene) -> bool) {
        tokio::time::timeout(WAIT_TIMEOUT, async {
            loop {
                self.agent.tick(&mut self.scene);
                if done(&self.scene) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("timed out waiting for reconciliation");
    }
}
