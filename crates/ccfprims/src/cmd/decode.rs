use bytes::Bytes;
use ccfprims_wire::{decode_ccf_header, decode_mac_packet, CcfHeader, CCF_HEADER_SIZE};
use serde::Serialize;

use crate::cmd::DecodeArgs;
use crate::exit::{wire_error, CliError, CliResult, SUCCESS};
use crate::output::{hex_preview, print_report, OutputFormat, Report};

#[derive(Debug, Serialize)]
struct MacSummary {
    sequence: u16,
    length: u16,
    wire_size: usize,
}

/// The MAC packets a segment carries from `offmac` on.
#[derive(Debug, Default, Serialize)]
struct MacContents {
    /// Bytes before `offmac` that finish a packet from earlier segments.
    lead: usize,
    packets: Vec<MacSummary>,
    /// Bytes after the last whole packet, continued in later segments.
    partial: usize,
}

#[derive(Serialize)]
struct DecodeOutput {
    schema_id: &'static str,
    header: CcfHeader,
    content_length: usize,
    content: String,
    mac: Option<MacContents>,
}

impl Report for DecodeOutput {
    fn rows(&self) -> Vec<(&'static str, String)> {
        let h = &self.header;
        let mut rows = vec![
            ("pfi", h.pfi.to_string()),
            ("reserved", h.reserved.to_string()),
            ("offmac", h.offmac.to_string()),
            ("sequence", h.sequence.to_string()),
            ("sc", h.sc.to_string()),
            ("request", h.request.to_string()),
            ("hcs", format!("0x{:04x}", h.hcs)),
            ("content_length", self.content_length.to_string()),
        ];
        if !self.content.is_empty() {
            rows.push(("content", self.content.clone()));
        }
        if let Some(mac) = &self.mac {
            rows.push(("mac_lead", mac.lead.to_string()));
            for packet in &mac.packets {
                rows.push((
                    "mac_packet",
                    format!(
                        "sequence={} length={} wire_size={}",
                        packet.sequence, packet.length, packet.wire_size
                    ),
                ));
            }
            rows.push(("mac_partial", mac.partial.to_string()));
        }
        rows
    }
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = parse_hex(&args.hex)?;
    let header = decode_ccf_header(&bytes).map_err(|err| wire_error("decode", err))?;
    let content = Bytes::from(bytes).slice(CCF_HEADER_SIZE..);

    let out = DecodeOutput {
        schema_id: "https://schemas.3leaps.dev/ccfprims/cli/v1/ccf-header.schema.json",
        header,
        content_length: content.len(),
        content: hex_preview(&content, 32),
        mac: mac_contents(&header, content),
    };

    print_report(&out, format);
    Ok(SUCCESS)
}

/// Split the content at `offmac` into whole MAC packets and a partial tail.
/// `None` when the segment starts no packet or `offmac` lies past its end.
fn mac_contents(header: &CcfHeader, content: Bytes) -> Option<MacContents> {
    let lead = usize::from(header.offmac);
    if !header.pfi || lead >= content.len() {
        return None;
    }

    let mut rest = content.slice(lead..);
    let mut packets = Vec::new();
    // Stops at the first packet the segment does not finish.
    while let Ok(Some(packet)) = decode_mac_packet(&mut rest) {
        packets.push(MacSummary {
            sequence: packet.header.sequence,
            length: packet.header.length,
            wire_size: packet.wire_size(),
        });
    }

    Some(MacContents {
        lead,
        packets,
        partial: rest.len(),
    })
}

fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: Vec<u8> = trimmed
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':')
        .collect();

    if digits.len() % 2 != 0 {
        return Err(CliError::usage("hex input has an odd number of digits"));
    }

    digits
        .chunks(2)
        .map(|pair| {
            let hi = nibble(pair[0])?;
            let lo = nibble(pair[1])?;
            Ok((hi << 4) | lo)
        })
        .collect()
}

fn nibble(digit: u8) -> CliResult<u8> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        other => Err(CliError::usage(format!(
            "invalid hex digit {:?}",
            char::from(other)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::{DATA_INVALID, USAGE};

    #[test]
    fn parses_separators_and_prefix() {
        assert_eq!(
            parse_hex("0x80:32 00 52").unwrap(),
            vec![0x80, 0x32, 0x00, 0x52]
        );
        assert_eq!(parse_hex("0F52").unwrap(), vec![0x0F, 0x52]);
    }

    #[test]
    fn rejects_bad_hex() {
        assert_eq!(parse_hex("abc").unwrap_err().code, USAGE);
        assert_eq!(parse_hex("zz").unwrap_err().code, USAGE);
    }

    #[test]
    fn short_input_is_invalid_data() {
        let err = run(
            DecodeArgs {
                hex: "8032".into(),
            },
            OutputFormat::Json,
        )
        .unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn mac_contents_lists_whole_packets() {
        let header = CcfHeader {
            pfi: true,
            offmac: 2,
            ..CcfHeader::default()
        };
        let content = Bytes::from_static(&[
            0xAA, 0xBB, // tail of an earlier packet
            0x00, 0x07, 0x00, 0x01, 0x41, // seq 7, "A"
            0x00, 0x08, 0x00, 0x05, 0x42, 0x43, // seq 8, 2 of 5 bytes
        ]);

        let mac = mac_contents(&header, content.clone()).unwrap();
        assert_eq!(mac.lead, 2);
        assert_eq!(mac.packets.len(), 1);
        assert_eq!(mac.packets[0].sequence, 7);
        assert_eq!(mac.packets[0].length, 1);
        assert_eq!(mac.packets[0].wire_size, 5);
        assert_eq!(mac.partial, 6);

        assert!(mac_contents(&CcfHeader::default(), content.clone()).is_none());
        let past_end = CcfHeader {
            pfi: true,
            offmac: 40,
            ..CcfHeader::default()
        };
        assert!(mac_contents(&past_end, content).is_none());
    }

    #[test]
    fn rows_include_header_fields() {
        let out = DecodeOutput {
            schema_id: "x",
            header: CcfHeader {
                sequence: 82,
                request: 3922,
                ..CcfHeader::default()
            },
            content_length: 0,
            content: String::new(),
            mac: None,
        };
        let rows = out.rows();
        assert!(rows.contains(&("sequence", "82".to_string())));
        assert!(rows.contains(&("request", "3922".to_string())));
        assert!(!rows.iter().any(|(field, _)| *field == "content"));
    }
}
