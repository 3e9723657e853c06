#![allow(async_fn_in_trait)]

use crate::usage::UsageDocument;

pub trait UsageSource {
    //None if the request failed or the response was no JSON
    async fn fetch(&mut self, date: &str) -> Option<UsageDocument>;
}

pub trait MessagePublisher {
    async fn publish(&self, topic: String, payload: String) -> anyhow::Result<()>;
}
