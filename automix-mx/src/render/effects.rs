//! Transition-specific effect chains
//!
//! Each style maps to a short filter chain applied to the *outgoing*
//! track, gated so it only becomes audible during the fade-out window.
//! `effect_start` is relative to the trimmed segment (seconds from the
//! segment's first sample).

use automix_common::TransitionStyle;

/// Format a seconds value for embedding in a filter expression
fn sec(v: f64) -> String {
    format!("{:.3}", v.max(0.0))
}

/// Gate clause activating a filter from `effect_start` on
fn gate(effect_start: f64) -> String {
    format!("enable='gte(t,{})'", sec(effect_start))
}

/// Filter chain for one transition style
///
/// Returns an empty chain for pure-crossfade styles. The chain applies
/// in order between the track's fade-in and fade-out filters.
pub fn transition_effect_chain(
    style: TransitionStyle,
    effect_start: f64,
    fade_duration: f64,
) -> Vec<String> {
    use TransitionStyle::*;
    let duration = fade_duration.max(0.1);
    match style {
        Smooth | Drop | Cut | Energy => Vec::new(),

        FilterSweep => vec![format!(
            "highpass=f='20+20000*(t-{})/{}':{}",
            sec(effect_start),
            sec(duration),
            gate(effect_start)
        )],

        EchoReverb => vec![format!("aecho=0.8:0.9:1000:0.3:{}", gate(effect_start))],

        // The whole trimmed segment plays backwards into the fade
        Backspin => vec!["areverse".to_string()],

        TapeStop => vec!["asetrate=22050".to_string(), "aresample=44100".to_string()],

        StutterEdit => vec!["atempo=1.5".to_string(), "atempo=0.66".to_string()],

        ThreeBandSwap => vec![
            format!("equalizer=f=200:t=q:w=1:g=-10:{}", gate(effect_start)),
            format!("equalizer=f=2500:t=q:w=1:g=10:{}", gate(effect_start)),
            format!("equalizer=f=8000:t=q:w=1:g=-10:{}", gate(effect_start)),
        ],

        BassDrop => vec![format!("lowpass=f=200:{}", gate(effect_start))],

        SnareRoll => vec![format!("highpass=f=2000:{}", gate(effect_start))],

        NoiseRiser => vec![format!(
            "highpass=f='500+4000*(t-{})/{}':{}",
            sec(effect_start),
            sec(duration),
            gate(effect_start)
        )],

        VocalHandoff => vec![format!("aecho=0.7:0.8:500:0.4:{}", gate(effect_start))],

        BassSwap => vec![format!("highpass=f=200:poles=2:{}", gate(effect_start))],

        ReverbWash => vec![format!(
            "aecho=0.8:0.95:1000|1500:0.5|0.3:{}",
            gate(effect_start)
        )],

        EchoOut => vec![format!("aecho=0.8:0.85:750:0.5:{}", gate(effect_start))],
    }
}
