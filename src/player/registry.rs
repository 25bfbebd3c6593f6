use crate::core::{BridgeError, Result};
use crate::player::audio_player::AudioPlayer;
use log::info;
use std::collections::HashMap;

/// 播放器注册表：playerId -> 播放器
///
/// 只由分发器修改，不支持多线程并发修改。
#[derive(Default)]
pub struct PlayerRegistry {
    players: HashMap<String, AudioPlayer>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入播放器，返回同 id 的旧播放器（由调用方负责销毁）
    pub fn insert(&mut self, player: AudioPlayer) -> Option<AudioPlayer> {
        self.players.insert(player.id().to_string(), player)
    }

    pub fn get(&self, id: &str) -> Option<&AudioPlayer> {
        self.players.get(id)
    }

    pub fn require_mut(&mut self, id: &str) -> Result<&mut AudioPlayer> {
        self.players
            .get_mut(id)
            .ok_or_else(|| BridgeError::UnknownPlayer(id.to_string()))
    }

    pub fn remove(&mut self, id: &str) -> Option<AudioPlayer> {
        self.players.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.players.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.players.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// 销毁全部播放器（每个播放器先释放 sink）
    pub fn clear(&mut self) {
        if self.players.is_empty() {
            return;
        }
        info!("🧹 销毁全部播放器: {} 个", self.players.len());
        for (_, mut player) in self.players.drain() {
            player.dispose();
        }
    }
}

impl Drop for PlayerRegistry {
    fn drop(&mut self) {
        self.clear();
    }
}
