#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use carrie_voice::{SpeechVendorClient, VendorConfig};

pub const TEST_VOICE: &str = "voice-test";

/// Writes an executable `/bin/sh` script standing in for ffmpeg.
pub fn fake_ffmpeg(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    {
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh").unwrap();
        writeln!(file, "{}", body).unwrap();
        file.sync_all().unwrap();
    }
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Passes stdin through unchanged, so "MP3" bytes come back as PCM.
pub fn passthrough_ffmpeg(dir: &Path) -> PathBuf {
    fake_ffmpeg(dir, "ffmpeg-cat", "exec cat")
}

pub fn vendor_config(base_url: &str) -> VendorConfig {
    let mut config = VendorConfig::new("test-key").with_base_url(base_url);
    config.voice_id = TEST_VOICE.to_string();
    config
}

pub fn vendor_client(base_url: &str) -> SpeechVendorClient {
    SpeechVendorClient::new(vendor_config(base_url)).unwrap()
}
