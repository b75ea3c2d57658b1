//! Hand-written fakes shared by the integration suites.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    AudioSource, BridgeError, Clock, HttpClient, HttpRequest, HttpResponse, HttpStreamResponse,
    MediaOutput, NetworkInfo, NetworkMonitor,
};
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use core_library::{
    OfflineSong, OfflineSongRepository, OfflineStore, Result as LibraryResult, VideoId,
};
use core_playback::{PlaybackError, ResolvedSource, SourceResolver};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

// ============================================================================
// HTTP
// ============================================================================

/// One scripted answer for a URL.
#[derive(Clone)]
pub enum Reply {
    Body(Bytes),
    Status(u16),
    Fail(String),
    /// Never answers; only a timeout or cancel ends the attempt.
    Hang,
    /// Streamed body in chunks, with an optional Content-Length.
    Chunks(Vec<Bytes>, Option<u64>),
    /// Streams the chunks, then stalls forever.
    Stall(Vec<Bytes>),
}

/// HTTP fake answering per-URL scripts; the last reply of a script repeats.
#[derive(Default)]
pub struct ScriptedHttp {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedHttp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn route(&self, url: &str, replies: Vec<Reply>) {
        self.routes.lock().insert(url.to_string(), replies.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn next_reply(&self, url: &str) -> Reply {
        self.calls.lock().push(url.to_string());
        let mut routes = self.routes.lock();
        match routes.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Reply::Status(404)),
            Some(queue) => queue.front().cloned().unwrap_or(Reply::Status(404)),
            None => Reply::Status(404),
        }
    }
}

#[async_trait]
impl HttpClient for ScriptedHttp {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        match self.next_reply(&request.url) {
            Reply::Body(body) => Ok(response(200, body)),
            Reply::Chunks(chunks, _) | Reply::Stall(chunks) => {
                Ok(response(200, Bytes::from(chunks.concat())))
            }
            Reply::Status(status) => Ok(response(status, Bytes::new())),
            Reply::Fail(message) => Err(BridgeError::OperationFailed(message)),
            Reply::Hang => futures::future::pending().await,
        }
    }

    async fn execute_stream(&self, request: HttpRequest) -> BridgeResult<HttpStreamResponse> {
        match self.next_reply(&request.url) {
            Reply::Body(body) => {
                let len = body.len() as u64;
                Ok(stream_response(200, vec![body], Some(len), false))
            }
            Reply::Chunks(chunks, content_length) => {
                Ok(stream_response(200, chunks, content_length, false))
            }
            Reply::Stall(chunks) => Ok(stream_response(200, chunks, None, true)),
            Reply::Status(status) => Ok(stream_response(status, Vec::new(), None, false)),
            Reply::Fail(message) => Err(BridgeError::OperationFailed(message)),
            Reply::Hang => futures::future::pending().await,
        }
    }
}

fn response(status: u16, body: Bytes) -> HttpResponse {
    HttpResponse {
        status,
        headers: HashMap::new(),
        body,
    }
}

fn stream_response(
    status: u16,
    chunks: Vec<Bytes>,
    content_length: Option<u64>,
    stall: bool,
) -> HttpStreamResponse {
    let chunks = stream::iter(chunks.into_iter().map(Ok::<Bytes, BridgeError>));
    let body = if stall {
        chunks.chain(stream::pending()).boxed()
    } else {
        chunks.boxed()
    };
    HttpStreamResponse {
        status,
        headers: HashMap::new(),
        content_length,
        body,
    }
}

// ============================================================================
// Media output
// ============================================================================

/// Records every command; `play` fails for sources listed in `reject`.
#[derive(Default)]
pub struct FakeMedia {
    log: Mutex<Vec<String>>,
    loaded: Mutex<Option<AudioSource>>,
    reject: Mutex<HashSet<String>>,
    paused: AtomicBool,
    duration: Mutex<Option<Duration>>,
}

impl FakeMedia {
    pub fn new() -> Arc<Self> {
        let media = Self::default();
        media.paused.store(true, Ordering::SeqCst);
        Arc::new(media)
    }

    pub fn reject(&self, url: &str) {
        self.reject.lock().insert(url.to_string());
    }

    pub fn set_duration(&self, duration: Duration) {
        *self.duration.lock() = Some(duration);
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn loaded(&self) -> Option<AudioSource> {
        self.loaded.lock().clone()
    }

    fn label(source: &AudioSource) -> String {
        match source {
            AudioSource::Blob { data, .. } => format!("blob:{}", data.len()),
            AudioSource::Remote { url } => url.clone(),
        }
    }
}

#[async_trait]
impl MediaOutput for FakeMedia {
    async fn load(&self, source: AudioSource) -> BridgeResult<()> {
        self.log.lock().push(format!("load {}", Self::label(&source)));
        *self.loaded.lock() = Some(source);
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        let label = self.loaded.lock().as_ref().map(Self::label);
        if let Some(label) = label {
            if self.reject.lock().contains(&label) {
                self.log.lock().push(format!("reject {label}"));
                return Err(BridgeError::OperationFailed("unsupported source".into()));
            }
        }
        self.log.lock().push("play".into());
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.log.lock().push("pause".into());
        self.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn seek(&self, position: Duration) -> BridgeResult<()> {
        self.log.lock().push(format!("seek {}", position.as_millis()));
        Ok(())
    }

    async fn stop(&self) -> BridgeResult<()> {
        self.log.lock().push("stop".into());
        *self.loaded.lock() = None;
        self.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn duration(&self) -> Option<Duration> {
        *self.duration.lock()
    }
}

// ============================================================================
// Network, clock, resolver
// ============================================================================

pub struct SwitchableNetwork {
    online: AtomicBool,
}

impl SwitchableNetwork {
    pub fn online() -> Arc<Self> {
        Arc::new(Self {
            online: AtomicBool::new(true),
        })
    }

    pub fn offline() -> Arc<Self> {
        Arc::new(Self {
            online: AtomicBool::new(false),
        })
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl NetworkMonitor for SwitchableNetwork {
    async fn get_network_info(&self) -> BridgeResult<NetworkInfo> {
        Ok(if self.online.load(Ordering::SeqCst) {
            NetworkInfo::connected()
        } else {
            NetworkInfo::disconnected()
        })
    }
}

pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn at_millis(millis: i64) -> Arc<Self> {
        Arc::new(Self(Utc.timestamp_millis_opt(millis).single().unwrap()))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Resolver with per-id answers. Ids listed in `slow` wait for `delay`
/// (honouring cancellation) before answering.
#[derive(Default)]
pub struct FakeResolver {
    answers: Mutex<HashMap<String, std::result::Result<ResolvedSource, String>>>,
    slow: Mutex<HashMap<String, Duration>>,
    calls: AtomicUsize,
}

impl FakeResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn answer(&self, id: &str, url: &str) {
        self.answers
            .lock()
            .insert(id.to_string(), Ok(ResolvedSource::single(url)));
    }

    pub fn answer_with(&self, id: &str, resolved: ResolvedSource) {
        self.answers.lock().insert(id.to_string(), Ok(resolved));
    }

    pub fn fail(&self, id: &str, message: &str) {
        self.answers
            .lock()
            .insert(id.to_string(), Err(message.to_string()));
    }

    pub fn slow(&self, id: &str, delay: Duration) {
        self.slow.lock().insert(id.to_string(), delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceResolver for FakeResolver {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn resolve(
        &self,
        video_id: &VideoId,
        cancel: &CancellationToken,
    ) -> core_playback::Result<ResolvedSource> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.slow.lock().get(video_id.as_str()).copied();
        if let Some(delay) = delay {
            tokio::select! {
                _ = cancel.cancelled() => return Err(PlaybackError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        let answer = self.answers.lock().get(video_id.as_str()).cloned();
        match answer {
            Some(Ok(resolved)) => Ok(resolved),
            Some(Err(message)) => Err(PlaybackError::resolution(video_id.as_str(), message)),
            None => Err(PlaybackError::resolution(video_id.as_str(), "unknown id")),
        }
    }
}

// ============================================================================
// Store helpers
// ============================================================================

/// In-memory repository; SQLite itself is covered by core-library.
#[derive(Default)]
pub struct MemoryRepo {
    songs: Mutex<HashMap<VideoId, OfflineSong>>,
}

#[async_trait]
impl OfflineSongRepository for MemoryRepo {
    async fn get(&self, video_id: &VideoId) -> LibraryResult<Option<OfflineSong>> {
        Ok(self.songs.lock().get(video_id).cloned())
    }

    async fn put(&self, song: &OfflineSong) -> LibraryResult<()> {
        self.songs.lock().insert(song.video_id.clone(), song.clone());
        Ok(())
    }

    async fn delete(&self, video_id: &VideoId) -> LibraryResult<bool> {
        Ok(self.songs.lock().remove(video_id).is_some())
    }

    async fn list_all(&self, title_filter: Option<&str>) -> LibraryResult<Vec<OfflineSong>> {
        let mut songs: Vec<OfflineSong> = self
            .songs
            .lock()
            .values()
            .filter(|song| title_filter.map_or(true, |f| song.title_matches(f)))
            .cloned()
            .collect();
        songs.sort_by(|a, b| {
            b.downloaded_at
                .cmp(&a.downloaded_at)
                .then_with(|| a.video_id.cmp(&b.video_id))
        });
        Ok(songs)
    }

    async fn contains(&self, video_id: &VideoId) -> LibraryResult<bool> {
        Ok(self.songs.lock().contains_key(video_id))
    }
}

/// Answers `contains` from the state at call time, then takes `delay` to
/// return it.
pub struct SlowLookupRepo {
    inner: MemoryRepo,
    delay: Duration,
}

impl SlowLookupRepo {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryRepo::default(),
            delay,
        }
    }
}

#[async_trait]
impl OfflineSongRepository for SlowLookupRepo {
    async fn get(&self, video_id: &VideoId) -> LibraryResult<Option<OfflineSong>> {
        self.inner.get(video_id).await
    }

    async fn put(&self, song: &OfflineSong) -> LibraryResult<()> {
        self.inner.put(song).await
    }

    async fn delete(&self, video_id: &VideoId) -> LibraryResult<bool> {
        self.inner.delete(video_id).await
    }

    async fn list_all(&self, title_filter: Option<&str>) -> LibraryResult<Vec<OfflineSong>> {
        self.inner.list_all(title_filter).await
    }

    async fn contains(&self, video_id: &VideoId) -> LibraryResult<bool> {
        let found = self.inner.contains(video_id).await?;
        tokio::time::sleep(self.delay).await;
        Ok(found)
    }
}

pub async fn memory_store() -> OfflineStore {
    OfflineStore::new(Arc::new(MemoryRepo::default()))
}

pub fn offline_song(id: &str, downloaded_at: i64) -> OfflineSong {
    OfflineSong {
        video_id: VideoId::from(id),
        title: format!("Song {id}"),
        thumbnail_url: format!("https://img.example/{id}.jpg"),
        audio: vec![7; 16],
        cover: None,
        duration_label: "3:00".into(),
        downloaded_at,
    }
}
