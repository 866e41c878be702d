use crossbeam_channel::Sender;
use log::{debug, info, warn};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use super::gain::{GainCommand, RampedGain};
use crate::engine::StemMixer;
use crate::error::{SanpoError, SanpoResult};
use crate::mapping::AudioState;

struct StemChannel {
    sink: Option<Sink>,
    gain: Sender<GainCommand>,
}

/// Three looping stems on the default output, one gain ramp each.
///
/// Stems are always decoded, so a missing or corrupt file is reported even
/// when no output device could be opened.
pub struct RodioStemMixer {
    output: Option<(OutputStream, OutputStreamHandle)>,
    channels: HashMap<AudioState, StemChannel>,
}

impl RodioStemMixer {
    pub fn open() -> Self {
        let output = match OutputStream::try_default() {
            Ok(output) => Some(output),
            Err(e) => {
                warn!("Audio engine failed to start ({}), stems will be silent", e);
                None
            }
        };
        Self {
            output,
            channels: HashMap::new(),
        }
    }

    pub fn is_silent(&self) -> bool {
        self.output.is_none()
    }

    fn decode(path: &Path) -> SanpoResult<Decoder<BufReader<File>>> {
        let name = path.display().to_string();
        let file = File::open(path).map_err(|e| SanpoError::resource_load(&name, e))?;
        Decoder::new(BufReader::new(file)).map_err(|e| SanpoError::resource_load(&name, e))
    }

    fn load_one(&self, path: &Path) -> SanpoResult<StemChannel> {
        let decoder = Self::decode(path)?;
        info!(
            "Loaded stem: {:?} ({}Hz, {} channels)",
            path,
            decoder.sample_rate(),
            decoder.channels()
        );

        let looped = decoder.repeat_infinite().convert_samples::<f32>();
        let (source, gain) = RampedGain::new(looped, 0.0);

        let sink = match &self.output {
            Some((_, handle)) => {
                let sink = Sink::try_new(handle)
                    .map_err(|e| SanpoError::AudioEngine(e.to_string()))?;
                sink.pause();
                sink.append(source);
                Some(sink)
            }
            None => None,
        };
        Ok(StemChannel { sink, gain })
    }
}

impl StemMixer for RodioStemMixer {
    fn load_stems(&mut self, stems: &[(AudioState, PathBuf)]) -> SanpoResult<()> {
        let mut loaded = HashMap::with_capacity(stems.len());
        for (state, path) in stems {
            loaded.insert(*state, self.load_one(path)?);
        }
        self.channels = loaded;
        Ok(())
    }

    fn start_loop(&mut self, channel: AudioState) -> SanpoResult<()> {
        let stem = self.channels.get(&channel).ok_or_else(|| {
            SanpoError::AudioEngine(format!("no stem loaded for {}", channel.label()))
        })?;
        if let Some(sink) = &stem.sink {
            sink.play();
            debug!("Looping {} stem", channel.label());
        }
        Ok(())
    }

    fn set_gain(&mut self, channel: AudioState, target: f32, ramp_seconds: f32) {
        let Some(stem) = self.channels.get(&channel) else {
            warn!("Gain change for unloaded {} stem", channel.label());
            return;
        };
        let command = GainCommand {
            target,
            ramp_seconds,
        };
        if stem.gain.send(command).is_err() {
            debug!("{} stem is no longer playing", channel.label());
        }
    }
}
