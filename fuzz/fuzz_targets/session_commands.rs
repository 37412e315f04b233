#![no_main]

use libfuzzer_sys::fuzz_target;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tunedrop::audio::NullAudioEngine;
use tunedrop::notify::LogNotifier;
use tunedrop::player::MediaSession;

fn tracks() -> &'static [PathBuf] {
    static TRACKS: OnceLock<Vec<PathBuf>> = OnceLock::new();
    TRACKS.get_or_init(|| {
        let dir = std::env::temp_dir().join("tunedrop-fuzz-tracks");
        let _ = std::fs::create_dir_all(&dir);
        (0..8)
            .map(|idx| {
                let path = dir.join(format!("track_{idx}.mp3"));
                let _ = std::fs::write(&path, b"not audio");
                path
            })
            .collect()
    })
}

fuzz_target!(|data: &[u8]| {
    let Some((&first, commands)) = data.split_first() else {
        return;
    };
    let all = tracks();
    let len = usize::from(first) % all.len() + 1;
    let mut session = MediaSession::new(NullAudioEngine::new(), Arc::new(LogNotifier));
    if session.set_queue(&all[..len], usize::from(first)).is_err() {
        return;
    }

    for byte in commands {
        let _ = match byte % 10 {
            0 => session.toggle_play_pause(),
            1 => session.skip_next(),
            2 => session.skip_previous(),
            3 => {
                session.toggle_shuffle();
                Ok(())
            }
            4 => {
                session.toggle_repeat();
                Ok(())
            }
            5 => session.seek_to(u64::from(*byte) * 1_000),
            6 => session.tick().map(|_| ()),
            7 => {
                session.dismiss_notification();
                Ok(())
            }
            8 => session.play(),
            _ => {
                session.stop_and_clear();
                Ok(())
            }
        };

        let state = session.state();
        if let Some(index) = state.queue_index {
            assert!(index < state.queue_len);
        }
    }
});
