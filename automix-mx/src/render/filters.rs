//! Transcoder filter-graph construction
//!
//! Builds the `filter_complex` string executed by the transcoder. Each
//! track gets a linear chain in a contractual order (loudness pre-gain,
//! tempo, trim, optional EQ/compression, fades, transition effect,
//! optional ducking/sweep), is delay-aligned onto the output timeline,
//! and the N chains meet in one non-normalizing mix followed by final
//! loudness and limiting.

use super::effects::transition_effect_chain;
use super::playback::PlaybackEntry;
use super::RenderConfig;
use crate::plan::PlannedTransition;
use automix_common::LoudnessMode;

/// Steps in the staged tempo ramp
const RAMP_STEPS: usize = 4;

fn sec(v: f64) -> String {
    format!("{:.3}", v)
}

/// Label-plumbing helper for one track's chain
struct TrackChain {
    track: usize,
    statements: Vec<String>,
    pending: Vec<String>,
    current: String,
    seq: usize,
}

impl TrackChain {
    fn new(track: usize) -> Self {
        Self {
            track,
            statements: Vec::new(),
            pending: Vec::new(),
            current: format!("{track}:a"),
            seq: 0,
        }
    }

    fn next_label(&mut self) -> String {
        let label = format!("t{}x{}", self.track, self.seq);
        self.seq += 1;
        label
    }

    fn push(&mut self, filter: impl Into<String>) {
        self.pending.push(filter.into());
    }

    /// Emit pending inline filters into a named statement
    fn flush(&mut self) -> String {
        if self.pending.is_empty() {
            return self.current.clone();
        }
        let label = self.next_label();
        self.statements.push(format!(
            "[{}]{}[{}]",
            self.current,
            self.pending.join(","),
            label
        ));
        self.pending.clear();
        self.current = label.clone();
        label
    }

    /// Close the chain under an explicit output label
    fn finish(mut self, out_label: &str) -> Vec<String> {
        if self.pending.is_empty() {
            self.pending.push("anull".to_string());
        }
        let statement = format!(
            "[{}]{}[{}]",
            self.current,
            self.pending.join(","),
            out_label
        );
        self.statements.push(statement);
        self.statements
    }
}

/// Staged tempo ramp: the ramp window is sliced and each slice gets an
/// intermediate tempo, converging on the final ratio
fn staged_tempo_ramp(chain: &mut TrackChain, ratio: f64, ramp_seconds: f64) {
    let src = chain.flush();
    let split_labels: Vec<String> = (0..=RAMP_STEPS).map(|_| chain.next_label()).collect();
    chain.statements.push(format!(
        "[{src}]asplit={}{}",
        RAMP_STEPS + 1,
        split_labels
            .iter()
            .map(|l| format!("[{l}]"))
            .collect::<String>()
    ));

    let mut seg_labels = Vec::with_capacity(RAMP_STEPS + 1);
    let step = ramp_seconds / RAMP_STEPS as f64;
    for k in 0..RAMP_STEPS {
        let a = k as f64 * step;
        let b = (k + 1) as f64 * step;
        let step_ratio = 1.0 + (ratio - 1.0) * (k as f64 + 0.5) / RAMP_STEPS as f64;
        let out = chain.next_label();
        chain.statements.push(format!(
            "[{}]atrim=start={}:end={},asetpts=PTS-STARTPTS,atempo={:.6}[{}]",
            split_labels[k],
            sec(a),
            sec(b),
            step_ratio,
            out
        ));
        seg_labels.push(out);
    }
    let tail = chain.next_label();
    chain.statements.push(format!(
        "[{}]atrim=start={},asetpts=PTS-STARTPTS,atempo={:.6}[{}]",
        split_labels[RAMP_STEPS],
        sec(ramp_seconds),
        ratio,
        tail
    ));
    seg_labels.push(tail);

    let joined = chain.next_label();
    chain.statements.push(format!(
        "{}concat=n={}:v=0:a=1[{}]",
        seg_labels
            .iter()
            .map(|l| format!("[{l}]"))
            .collect::<String>(),
        RAMP_STEPS + 1,
        joined
    ));
    chain.current = joined;
}

/// Three-band split, per-band compression, recombine
fn multiband_compression(chain: &mut TrackChain) {
    let src = chain.flush();
    let t = chain.track;
    let (lo, mid, hi) = (format!("t{t}lo"), format!("t{t}mid"), format!("t{t}hi"));
    chain.statements.push(format!(
        "[{src}]acrossover=split=250 4000[{lo}][{mid}][{hi}]"
    ));
    let bands = [
        (&lo, "-24dB", 2),
        (&mid, "-20dB", 3),
        (&hi, "-18dB", 4),
    ];
    let mut compressed = Vec::with_capacity(3);
    for (label, threshold, ratio) in bands {
        let out = chain.next_label();
        chain.statements.push(format!(
            "[{label}]acompressor=threshold={threshold}:ratio={ratio}:attack=20:release=100[{out}]"
        ));
        compressed.push(out);
    }
    let joined = chain.next_label();
    chain.statements.push(format!(
        "{}amix=inputs=3:normalize=0[{}]",
        compressed
            .iter()
            .map(|l| format!("[{l}]"))
            .collect::<String>(),
        joined
    ));
    chain.current = joined;
}

/// Build one track's chain ending in `[t{i}out]`
fn build_track_chain(
    index: usize,
    entry: &PlaybackEntry,
    transition_in: Option<&PlannedTransition>,
    transition_out: Option<&PlannedTransition>,
    config: &RenderConfig,
) -> Vec<String> {
    let mut chain = TrackChain::new(index);

    // 1. Loudness pre-gain
    chain.push("loudnorm=I=-14:TP=-1:LRA=11");

    // 2. Tempo
    let ratio = entry.tempo_ratio;
    let ramping = config.tempo_ramp_seconds > 0.0 && (ratio - 1.0).abs() > 0.01;
    if ramping {
        staged_tempo_ramp(&mut chain, ratio, config.tempo_ramp_seconds);
    } else if (ratio - 1.0).abs() > 0.001 {
        chain.push(format!("atempo={ratio:.6}"));
    }

    // 3. Trim with PTS reset
    chain.push(format!(
        "atrim=start={}:end={}",
        sec(entry.start_offset),
        sec(entry.trim_end)
    ));
    chain.push("asetpts=PTS-STARTPTS");

    // 4. Dynamic EQ against vocal-instrument masking
    if config.enable_dynamic_eq {
        chain.push("equalizer=f=500:t=q:w=2:g=-2");
        chain.push("equalizer=f=2500:t=q:w=2:g=-2");
    }

    // 5. Multiband compression
    if config.enable_multiband_compression {
        multiband_compression(&mut chain);
    }

    // 6. Fade-in, shaped by the incoming transition's curve
    if entry.fade_in_duration > 0.0 {
        let curve = transition_in
            .map(|t| t.curve2.as_str())
            .unwrap_or("tri");
        chain.push(format!(
            "afade=t=in:st=0:d={}:curve={}",
            sec(entry.fade_in_duration),
            curve
        ));
    }

    // 7 + 8. Transition effect gated to the fade-out window, then fade-out
    if let (Some(fade_out_start), Some(transition)) = (entry.fade_out_start, transition_out) {
        let effect_start = fade_out_start - entry.start_offset;
        for filter in
            transition_effect_chain(transition.style, effect_start, entry.fade_out_duration)
        {
            chain.push(filter);
        }
        if entry.fade_out_duration > 0.0 {
            chain.push(format!(
                "afade=t=out:st={}:d={}:curve={}",
                sec(effect_start),
                sec(entry.fade_out_duration),
                transition.curve1.as_str()
            ));
        }

        // 9. Sidechain-style ducking of the outgoing track
        if config.enable_sidechain_ducking && entry.fade_out_duration > 0.0 {
            chain.push(format!(
                "volume='max(0.7,1-0.3*t/{})':eval=frame",
                sec(entry.fade_out_duration)
            ));
        }

        // 10. Rising high-pass sweep under the fade
        if config.enable_filter_sweep {
            chain.push(format!(
                "highpass=f='20+2000*t/{}'",
                sec(entry.fade_out_duration.max(0.5))
            ));
        }
    }

    chain.finish(&format!("t{index}out"))
}

/// Build the full main filter graph for a plan
pub fn build_main_graph(
    entries: &[PlaybackEntry],
    transitions: &[PlannedTransition],
    config: &RenderConfig,
) -> String {
    let mut statements: Vec<String> = Vec::new();
    let n = entries.len();

    for (i, entry) in entries.iter().enumerate() {
        let transition_in = if i > 0 { transitions.get(i - 1) } else { None };
        let transition_out = if i < n - 1 { transitions.get(i) } else { None };
        statements.extend(build_track_chain(i, entry, transition_in, transition_out, config));
        let delay_ms = (entry.start_time * 1000.0).round() as i64;
        statements.push(format!("[t{i}out]adelay={delay_ms}:all=1[t{i}d]"));
    }

    let inputs: String = (0..n).map(|i| format!("[t{i}d]")).collect();
    statements.push(format!("{inputs}amix=inputs={n}:normalize=0[mix]"));

    let mut current = "mix".to_string();
    if let Some(loudnorm) = final_loudnorm(config) {
        statements.push(format!("[{current}]{loudnorm}[norm]"));
        current = "norm".to_string();
    }
    statements.push(format!(
        "[{current}]alimiter=level_in=1:level_out=0.95[out]"
    ));

    statements.join(";")
}

/// Simplified fallback graph: plain per-segment trim + fades + delay
///
/// Used when the main graph fails for any reason; must always be
/// executable for well-formed inputs.
pub fn build_fallback_graph(n: usize, mean_fade: f64, config: &RenderConfig) -> String {
    let per_segment = if n > 0 {
        (config.target_duration_seconds + (n as f64 - 1.0) * mean_fade) / n as f64
    } else {
        config.target_duration_seconds
    };
    let fade = mean_fade.min(per_segment / 2.0);

    let mut statements: Vec<String> = Vec::new();
    for i in 0..n {
        let fade_in = if i > 0 { fade } else { 0.0 };
        let mut filters = vec![
            format!("atrim=start=0:end={}", sec(per_segment)),
            "asetpts=PTS-STARTPTS".to_string(),
        ];
        if fade_in > 0.0 {
            filters.push(format!("afade=t=in:st=0:d={}", sec(fade_in)));
        }
        if i < n - 1 && fade > 0.0 {
            filters.push(format!(
                "afade=t=out:st={}:d={}",
                sec(per_segment - fade),
                sec(fade)
            ));
        }
        statements.push(format!("[{i}:a]{}[f{i}]", filters.join(",")));
        let start = i as f64 * (per_segment - fade);
        let delay_ms = (start.max(0.0) * 1000.0).round() as i64;
        statements.push(format!("[f{i}]adelay={delay_ms}:all=1[fd{i}]"));
    }

    let inputs: String = (0..n).map(|i| format!("[fd{i}]")).collect();
    statements.push(format!("{inputs}amix=inputs={n}:normalize=0[mix]"));

    let mut current = "mix".to_string();
    if let Some(loudnorm) = final_loudnorm(config) {
        statements.push(format!("[{current}]{loudnorm}[norm]"));
        current = "norm".to_string();
    }
    statements.push(format!(
        "[{current}]alimiter=level_in=1:level_out=0.95[out]"
    ));

    statements.join(";")
}

/// Final loudness normalization filter, per the configured mode
fn final_loudnorm(config: &RenderConfig) -> Option<String> {
    match config.loudness {
        LoudnessMode::EbuR128 => Some(format!(
            "loudnorm=I={}:TP=-1.5:LRA=11",
            format_loudness(config.target_loudness)
        )),
        LoudnessMode::Peak => Some("loudnorm=TP=-1.5:I=-14:LRA=11".to_string()),
        LoudnessMode::None => None,
    }
}

fn format_loudness(v: f64) -> String {
    if (v - v.round()).abs() < 1e-9 {
        format!("{}", v.round() as i64)
    } else {
        format!("{v:.1}")
    }
}
