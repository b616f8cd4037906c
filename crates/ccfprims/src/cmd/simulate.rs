use std::fs;
use std::path::Path;

use bytes::Bytes;
use ccfprims_buffer::{FragmentBuffer, PacketRef};
use ccfprims_engine::{
    CcfSegment, Event, Grant, HookResult, PackHooks, Packer, PackerConfig, UnpackHooks, Unpacker,
    UnpackerConfig,
};
use ccfprims_wire::mac::MAX_MAC_CONTENT;
use ccfprims_wire::{CCF_HEADER_SIZE, SEQUENCE_SPACE};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cmd::SimulateArgs;
use crate::exit::{
    engine_error, io_error, json_error, CliError, CliResult, DATA_INVALID, INTERNAL, SUCCESS,
};
use crate::output::{print_report, OutputFormat, Report};

/// Contents of the `--config` file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SimulationConfig {
    packer: PackerConfig,
    unpacker: UnpackerConfig,
}

impl SimulationConfig {
    fn load(path: &Path) -> CliResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|err| io_error(&format!("read {}", path.display()), err))?;
        serde_json::from_str(&text)
            .map_err(|err| json_error(&format!("parse {}", path.display()), err))
    }
}

/// Transmit side: collects scheduled segments in send order.
#[derive(Default)]
struct Uplink {
    segments: Vec<CcfSegment>,
    recycled: usize,
}

impl PackHooks for Uplink {
    fn start_send_timer(
        &mut self,
        at: f64,
        event: Event,
        segment: CcfSegment,
        channel_id: i32,
    ) -> HookResult {
        debug!(
            at,
            event = event.code(),
            channel_id,
            sequence = segment.header.sequence,
            len = segment.len(),
            "segment scheduled"
        );
        self.segments.push(segment);
        Ok(())
    }

    fn current_time(&self) -> f64 {
        0.0
    }

    fn recycle_packet(&mut self, _packet: PacketRef) {
        self.recycled += 1;
    }
}

/// Receive side: keeps reassembled packets and tallies piggyback requests.
#[derive(Default)]
struct Headend {
    packets: Vec<Bytes>,
    piggyback: usize,
    recycled: usize,
    dropped: usize,
}

impl UnpackHooks for Headend {
    fn signify_packet(&mut self, packet: FragmentBuffer) -> HookResult {
        self.packets.push(packet.to_bytes());
        Ok(())
    }

    fn signify_piggyback(&mut self, _sc: u8, request: usize) -> HookResult {
        self.piggyback += request;
        Ok(())
    }

    fn recycle_segment(&mut self, _segment: CcfSegment) {
        self.recycled += 1;
    }

    fn drop_segment(&mut self, segment: CcfSegment) {
        warn!(sequence = segment.header.sequence, "segment dropped");
        self.dropped += 1;
    }
}

#[derive(Debug, Serialize)]
struct SimulateReport {
    schema_id: &'static str,
    seed: u64,
    packets_sent: usize,
    packets_received: usize,
    packets_matched: usize,
    payload_bytes: usize,
    segments: usize,
    wire_bytes: usize,
    segments_dropped: usize,
    window_left: usize,
    piggyback_requested: usize,
    piggyback_expected: usize,
    piggyback_received: usize,
    shuffled: bool,
    ok: bool,
}

impl Report for SimulateReport {
    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("seed", self.seed.to_string()),
            ("packets_sent", self.packets_sent.to_string()),
            ("packets_received", self.packets_received.to_string()),
            ("packets_matched", self.packets_matched.to_string()),
            ("payload_bytes", self.payload_bytes.to_string()),
            ("segments", self.segments.to_string()),
            ("wire_bytes", self.wire_bytes.to_string()),
            ("segments_dropped", self.segments_dropped.to_string()),
            ("window_left", self.window_left.to_string()),
            ("piggyback_requested", self.piggyback_requested.to_string()),
            ("piggyback_expected", self.piggyback_expected.to_string()),
            ("piggyback_received", self.piggyback_received.to_string()),
            ("shuffled", self.shuffled.to_string()),
            ("ok", self.ok.to_string()),
        ]
    }
}

pub fn run(args: SimulateArgs, format: OutputFormat) -> CliResult<i32> {
    let report = simulate(&args)?;
    print_report(&report, format);

    if report.ok {
        Ok(SUCCESS)
    } else {
        Err(CliError::new(
            DATA_INVALID,
            format!(
                "reassembly mismatch: {} of {} packets matched, piggyback {} of {}",
                report.packets_matched,
                report.packets_sent,
                report.piggyback_received,
                report.piggyback_expected
            ),
        ))
    }
}

fn simulate(args: &SimulateArgs) -> CliResult<SimulateReport> {
    check_args(args)?;

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(multiplier) = args.multiplier {
        config.packer.piggyback_multiplier = multiplier;
        config.unpacker.piggyback_multiplier = multiplier;
    }

    let mut rng = StdRng::seed_from_u64(args.seed);
    let packets = generate_packets(&mut rng, args.packets, args.max_size)?;
    let payload_bytes = packets.iter().map(PacketRef::len).sum();

    let mut packer = Packer::with_config(config.packer, Uplink::default())
        .map_err(|err| engine_error("packer", err))?;
    for packet in &packets {
        packer
            .process(Some(packet.clone()))
            .map_err(|err| engine_error("enqueue", err))?;
    }

    let mut time = 1.0;
    let mut piggyback = args.piggyback;
    while packer.pending_packets() > 0 {
        let grant = Grant::new(0, time, args.grant_size);
        packer
            .add_grants([grant], std::mem::take(&mut piggyback))
            .map_err(|err| engine_error("grant", err))?;
        time += 1.0;
    }
    if piggyback > 0 {
        packer.add_piggyback(piggyback);
    }
    let piggyback_expected = args.piggyback - packer.piggyback_pending();

    let uplink = packer.into_hooks();
    info!(
        packets = packets.len(),
        segments = uplink.segments.len(),
        recycled = uplink.recycled,
        "packing complete"
    );

    let mut wire = uplink
        .segments
        .iter()
        .map(CcfSegment::to_wire)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| engine_error("encode", err))?;
    let segment_count = wire.len();
    let wire_bytes = wire.iter().map(Bytes::len).sum();

    let shuffled = !args.no_shuffle;
    if shuffled {
        // Keep every reordered run inside half the sequence space so no two
        // buffered segments share a sequence number.
        let depth = args.reorder_depth.min(usize::from(SEQUENCE_SPACE / 2));
        for run in wire.chunks_mut(depth) {
            run.shuffle(&mut rng);
        }
    }

    let mut unpacker = Unpacker::with_config(config.unpacker, Headend::default())
        .map_err(|err| engine_error("unpacker", err))?;
    for bytes in wire {
        let segment = CcfSegment::from_wire(bytes).map_err(|err| engine_error("decode", err))?;
        unpacker
            .process(Some(segment))
            .map_err(|err| engine_error("reassemble", err))?;
    }
    let window_left = unpacker.window_len();
    let headend = unpacker.into_hooks();
    info!(
        received = headend.packets.len(),
        recycled = headend.recycled,
        dropped = headend.dropped,
        window_left,
        "unpacking complete"
    );

    let packets_matched = count_matches(&packets, &headend.packets);
    let ok = packets_matched == packets.len()
        && headend.packets.len() == packets.len()
        && headend.piggyback == piggyback_expected
        && headend.dropped == 0
        && window_left == 0;

    Ok(SimulateReport {
        schema_id: "https://schemas.3leaps.dev/ccfprims/cli/v1/simulate-report.schema.json",
        seed: args.seed,
        packets_sent: packets.len(),
        packets_received: headend.packets.len(),
        packets_matched,
        payload_bytes,
        segments: segment_count,
        wire_bytes,
        segments_dropped: headend.dropped,
        window_left,
        piggyback_requested: args.piggyback,
        piggyback_expected,
        piggyback_received: headend.piggyback,
        shuffled,
        ok,
    })
}

fn check_args(args: &SimulateArgs) -> CliResult<()> {
    if args.max_size == 0 || args.max_size > MAX_MAC_CONTENT {
        return Err(CliError::usage(format!(
            "--max-size must be between 1 and {MAX_MAC_CONTENT}"
        )));
    }
    if args.grant_size <= CCF_HEADER_SIZE {
        return Err(CliError::usage(format!(
            "--grant-size must exceed the {CCF_HEADER_SIZE}-byte segment header"
        )));
    }
    if args.reorder_depth == 0 {
        return Err(CliError::usage("--reorder-depth must be at least 1"));
    }
    Ok(())
}

fn generate_packets(
    rng: &mut StdRng,
    count: usize,
    max_size: usize,
) -> CliResult<Vec<PacketRef>> {
    (0..count)
        .map(|i| {
            let len = rng.gen_range(1..=max_size);
            let content: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            PacketRef::mac(i as u16, content)
                .map_err(|err| CliError::new(INTERNAL, format!("build packet {i}: {err}")))
        })
        .collect()
}

/// Number of sent packets that came back byte for byte, each received packet
/// matching at most once.
fn count_matches(sent: &[PacketRef], received: &[Bytes]) -> usize {
    let mut sent: Vec<&[u8]> = sent.iter().map(|p| p.bytes().as_ref()).collect();
    let mut received: Vec<&[u8]> = received.iter().map(|b| b.as_ref()).collect();
    sent.sort_unstable();
    received.sort_unstable();

    let (mut i, mut j, mut matched) = (0, 0, 0);
    while i < sent.len() && j < received.len() {
        match sent[i].cmp(&received[j]) {
            std::cmp::Ordering::Equal => {
                matched += 1;
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
        }
    }
    matched
}
