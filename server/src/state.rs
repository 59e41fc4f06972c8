use std::{sync::Arc, time::Duration};

use tracing::info;

use crate::{
    config::Config,
    database::{RedisDirectory, init_redis},
    directory::{Directory, MemoryDirectory},
    event::EventStore,
    push::{Dispatcher, ExpoSender},
};

pub struct State {
    pub config: Config,
    pub directory: Box<dyn Directory>,
    pub events: EventStore,
    pub dispatcher: Dispatcher,
}

impl State {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let directory: Box<dyn Directory> = match &config.redis_url {
            Some(url) => {
                info!("Using Redis member directory");
                Box::new(RedisDirectory::new(init_redis(url).await))
            }
            None => {
                info!("Using in-memory member directory");
                Box::new(MemoryDirectory::new())
            }
        };

        let dispatcher = Dispatcher::new(
            Arc::new(ExpoSender::new(config.push_url.clone())),
            Duration::from_millis(config.burst_spacing_ms),
        );

        Self::with_parts(config, directory, dispatcher)
    }

    pub fn with_parts(
        config: Config,
        directory: Box<dyn Directory>,
        dispatcher: Dispatcher,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            directory,
            events: EventStore::new(),
            dispatcher,
        })
    }
}
