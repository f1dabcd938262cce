//! # ECU Block Decoder
//!
//! Decodes the ECU realtime data block and tracks link health.

use super::protocol::offsets::*;
use super::protocol::*;
use crate::error::{LinkError, Result};
use crate::serial::port_trait::{write_each, ByteSource};
use tracing::{debug, info, warn};

/// Decode a realtime data block
///
/// # Arguments
///
/// * `block` - Block bytes as received, at least [`ECU_MIN_VALID_BYTES`] long
///
/// # Returns
///
/// * `Result<EcuTelemetrySample>` - Every field converted from big-endian
///
/// # Errors
///
/// Returns error if the block is too short to cover every field
pub fn decode_sample(block: &[u8]) -> Result<EcuTelemetrySample> {
    if block.len() < ECU_MIN_VALID_BYTES {
        return Err(LinkError::Protocol(format!(
            "ECU block too short: {} bytes, need {}",
            block.len(),
            ECU_MIN_VALID_BYTES
        )));
    }

    let b = block;
    Ok(EcuTelemetrySample {
        seconds: be_u16(b, SECONDS),
        pulse_width_1: be_u16(b, PULSE_WIDTH_1),
        pulse_width_2: be_u16(b, PULSE_WIDTH_2),
        rpm: be_u16(b, RPM),
        advance: be_i16(b, ADVANCE),
        squirt: b[SQUIRT],
        engine: b[ENGINE],
        afr_target_1: b[AFR_TARGET_1],
        afr_target_2: b[AFR_TARGET_2],
        wbo2_en_1: b[WBO2_EN_1],
        wbo2_en_2: b[WBO2_EN_2],
        barometer: be_i16(b, BAROMETER),
        map: be_i16(b, MAP),
        mat: be_i16(b, MAT),
        coolant: be_i16(b, COOLANT),
        tps: be_i16(b, TPS),
        battery_voltage: be_i16(b, BATTERY_VOLTAGE),
        afr_1: be_i16(b, AFR_1),
        afr_2: be_i16(b, AFR_2),
        knock: be_i16(b, KNOCK),
        ego_cor_1: be_i16(b, EGO_COR_1),
        ego_cor_2: be_i16(b, EGO_COR_2),
        air_cor: be_i16(b, AIR_COR),
        warm_cor: be_i16(b, WARM_COR),
        accel_enrich: be_i16(b, ACCEL_ENRICH),
        tps_fuel_cut: be_i16(b, TPS_FUEL_CUT),
        baro_correction: be_i16(b, BARO_CORRECTION),
        gamma_enrich: be_i16(b, GAMMA_ENRICH),
        ve_1: be_i16(b, VE_1),
        ve_2: be_i16(b, VE_2),
        iac_step: be_i16(b, IAC_STEP),
        cold_adv_deg: be_i16(b, COLD_ADV_DEG),
        tps_dot: be_i16(b, TPS_DOT),
        map_dot: be_i16(b, MAP_DOT),
        dwell: be_i16(b, DWELL),
        maf: be_i16(b, MAF),
        fuel_load: b[FUEL_LOAD],
        fuel_cor: be_i16(b, FUEL_COR),
        port_status: b[PORT_STATUS],
        knock_retard: b[KNOCK_RETARD],
        eae_fuel_cor_1: be_i16(b, EAE_FUEL_COR_1),
        ego_v_1: be_i16(b, EGO_V_1),
        ego_v_2: be_i16(b, EGO_V_2),
        status_1: b[STATUS_1],
        status_2: b[STATUS_2],
        status_3: b[STATUS_3],
        status_4: b[STATUS_4],
        loop_time: be_u16(b, LOOP_TIME),
        status_5: be_u16(b, STATUS_5),
        tps_adc: be_u16(b, TPS_ADC),
        fuel_load_2: be_i16(b, FUEL_LOAD_2),
        ign_load: be_i16(b, IGN_LOAD),
        ign_load_2: be_i16(b, IGN_LOAD_2),
        sync_count: b[SYNC_COUNT],
        timing_err: b[TIMING_ERR] as i8,
        delta: be_i32(b, DELTA),
        wall_fuel_1: be_u32(b, WALL_FUEL_1),
        gpio_adc_0: be_u16(b, GPIO_ADC_0),
        gpio_adc_1: be_u16(b, GPIO_ADC_1),
        gpio_adc_2: be_u16(b, GPIO_ADC_2),
    })
}

fn be_u16(b: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([b[offset], b[offset + 1]])
}

fn be_i16(b: &[u8], offset: usize) -> i16 {
    i16::from_be_bytes([b[offset], b[offset + 1]])
}

fn be_u32(b: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([b[offset], b[offset + 1], b[offset + 2], b[offset + 3]])
}

fn be_i32(b: &[u8], offset: usize) -> i32 {
    i32::from_be_bytes([b[offset], b[offset + 1], b[offset + 2], b[offset + 3]])
}

/// Polling decoder for the ECU link
///
/// Each poll drains whatever the link has buffered, decodes it as one block
/// and asks the ECU for the next one.
#[derive(Debug)]
pub struct EcuDecoder {
    buffer: [u8; ECU_FRAME_SIZE],
    sample: EcuTelemetrySample,
    healthy: bool,
}

impl Default for EcuDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl EcuDecoder {
    /// Creates a decoder with an all-zero sample, reporting unhealthy
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: [0u8; ECU_FRAME_SIZE],
            sample: EcuTelemetrySample::default(),
            healthy: false,
        }
    }

    /// Read everything the link has buffered and decode it
    ///
    /// Health becomes `true` when at least [`ECU_MIN_VALID_BYTES`] arrived and
    /// `false` for any shorter non-empty read. An empty link leaves health as
    /// it was. Bytes beyond [`ECU_FRAME_SIZE`] are read and discarded.
    ///
    /// The read command for the next block is queued on every poll.
    ///
    /// # Returns
    ///
    /// * `Option<EcuTelemetrySample>` - The new sample, if a whole block arrived
    pub fn poll<S: ByteSource + ?Sized>(&mut self, link: &mut S) -> Option<EcuTelemetrySample> {
        let decoded = self.read_incoming(link);
        self.request_next(link);
        decoded
    }

    fn read_incoming<S: ByteSource + ?Sized>(&mut self, link: &mut S) -> Option<EcuTelemetrySample> {
        let count = link.available();
        if count == 0 {
            return None;
        }

        let mut received = 0;
        for _ in 0..count {
            let Some(byte) = link.read() else { break };
            if received < ECU_FRAME_SIZE {
                self.buffer[received] = byte;
            }
            received += 1;
        }

        self.set_healthy(received >= ECU_MIN_VALID_BYTES);

        let filled = received.min(ECU_FRAME_SIZE);
        match decode_sample(&self.buffer[..filled]) {
            Ok(sample) => {
                self.sample = sample;
                Some(sample)
            }
            Err(e) => {
                debug!("Discarding ECU read: {}", e);
                None
            }
        }
    }

    fn request_next<S: ByteSource + ?Sized>(&mut self, link: &mut S) {
        let written = write_each(link, &ECU_POLL_COMMAND);
        if written < ECU_POLL_COMMAND.len() {
            debug!(
                "ECU read command short of tx space ({} of {} bytes queued)",
                written,
                ECU_POLL_COMMAND.len()
            );
        }
    }

    fn set_healthy(&mut self, healthy: bool) {
        if healthy != self.healthy {
            if healthy {
                info!("ECU link healthy");
            } else {
                warn!("ECU link unhealthy");
            }
        }
        self.healthy = healthy;
    }

    /// Whether the last non-empty read carried a whole block
    pub fn healthy(&self) -> bool {
        self.healthy
    }

    /// Most recent decoded sample (all zero before the first block)
    pub fn sample(&self) -> &EcuTelemetrySample {
        &self.sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::port_trait::{MockByteSource, QueuedLink};

    fn reference_sample() -> EcuTelemetrySample {
        EcuTelemetrySample {
            seconds: 3600,
            pulse_width_1: 2500,
            pulse_width_2: 2480,
            rpm: 6000,
            advance: -35,
            squirt: 0x03,
            engine: 0x81,
            afr_target_1: 147,
            afr_target_2: 146,
            wbo2_en_1: 1,
            wbo2_en_2: 0,
            barometer: 1013,
            map: 850,
            mat: 720,
            coolant: 1805,
            tps: 455,
            battery_voltage: 126,
            afr_1: 148,
            afr_2: -149,
            knock: 12,
            ego_cor_1: 1000,
            ego_cor_2: 995,
            air_cor: 1002,
            warm_cor: 1000,
            accel_enrich: 0,
            tps_fuel_cut: 100,
            baro_correction: 1001,
            gamma_enrich: 1003,
            ve_1: 820,
            ve_2: 810,
            iac_step: -42,
            cold_adv_deg: 15,
            tps_dot: -300,
            map_dot: 250,
            dwell: 30,
            maf: 6500,
            fuel_load: 85,
            fuel_cor: -7,
            port_status: 0xA5,
            knock_retard: 4,
            eae_fuel_cor_1: 101,
            ego_v_1: 45,
            ego_v_2: 46,
            status_1: 0x11,
            status_2: 0x22,
            status_3: 0x33,
            status_4: 0x44,
            loop_time: 1234,
            status_5: 0xBEEF,
            tps_adc: 512,
            fuel_load_2: -12,
            ign_load: 700,
            ign_load_2: 701,
            sync_count: 2,
            timing_err: -5,
            delta: -123_456,
            wall_fuel_1: 0xDEAD_BEEF,
            gpio_adc_0: 1,
            gpio_adc_1: 1023,
            gpio_adc_2: 65535,
        }
    }

    #[test]
    fn test_decode_sample_too_short() {
        let block = [0u8; ECU_MIN_VALID_BYTES - 1];
        assert!(decode_sample(&block).is_err());
    }

    #[test]
    fn test_decode_sample_reproduces_every_field() {
        let sample = reference_sample();
        let decoded = decode_sample(&sample.to_bytes()).unwrap();
        assert_eq!(decoded, sample);
    }

    #[test]
    fn test_decode_sample_accepts_min_valid_bytes() {
        let sample = reference_sample();
        let bytes = sample.to_bytes();
        let decoded = decode_sample(&bytes[..ECU_MIN_VALID_BYTES]).unwrap();
        assert_eq!(decoded, sample);
    }

    #[test]
    fn test_decode_sample_byte_order() {
        let mut block = [0u8; ECU_FRAME_SIZE];
        block[RPM] = 0x17;
        block[RPM + 1] = 0x70; // 6000 RPM
        block[COOLANT] = 0xFF;
        block[COOLANT + 1] = 0x38; // -200 = -20.0 deg F

        let sample = decode_sample(&block).unwrap();
        assert_eq!(sample.rpm, 6000);
        assert_eq!(sample.coolant, -200);
    }

    #[test]
    fn test_poll_full_block_is_healthy() {
        let sample = reference_sample();
        let mut link = QueuedLink::default();
        link.push_inbound(&sample.to_bytes());

        let mut decoder = EcuDecoder::new();
        assert_eq!(decoder.poll(&mut link), Some(sample));
        assert!(decoder.healthy());
        assert_eq!(decoder.sample(), &sample);
        assert_eq!(link.available(), 0);
    }

    #[test]
    fn test_poll_short_block_is_unhealthy_without_sample() {
        let mut decoder = EcuDecoder::new();
        let mut link = QueuedLink::default();

        link.push_inbound(&reference_sample().to_bytes());
        decoder.poll(&mut link);
        assert!(decoder.healthy());

        for len in [1usize, 50, ECU_MIN_VALID_BYTES - 1] {
            link.push_inbound(&vec![0xAB; len]);
            assert_eq!(decoder.poll(&mut link), None, "len {}", len);
            assert!(!decoder.healthy(), "len {}", len);
            assert_eq!(decoder.sample(), &reference_sample());
        }
    }

    #[test]
    fn test_poll_empty_link_leaves_health_unchanged() {
        let mut decoder = EcuDecoder::new();
        let mut link = QueuedLink::default();

        link.push_inbound(&reference_sample().to_bytes());
        decoder.poll(&mut link);
        assert!(decoder.healthy());

        assert_eq!(decoder.poll(&mut link), None);
        assert!(decoder.healthy());
    }

    #[test]
    fn test_poll_discards_bytes_beyond_capacity() {
        let sample = reference_sample();
        let mut bytes = sample.to_bytes().to_vec();
        bytes.extend_from_slice(&[0xFF; 40]);

        let mut link = QueuedLink::default();
        link.push_inbound(&bytes);

        let mut decoder = EcuDecoder::new();
        assert_eq!(decoder.poll(&mut link), Some(sample));
        assert_eq!(link.available(), 0);
    }

    #[test]
    fn test_poll_always_sends_read_command() {
        let mut decoder = EcuDecoder::new();
        let mut link = QueuedLink::default();

        decoder.poll(&mut link);
        assert_eq!(&link.take_outbound()[..], &ECU_POLL_COMMAND);

        link.push_inbound(&[0u8; 10]);
        decoder.poll(&mut link);
        assert_eq!(&link.take_outbound()[..], &ECU_POLL_COMMAND);
    }

    #[test]
    fn test_poll_drops_read_command_without_tx_space() {
        let mut mock = MockByteSource::new();
        mock.expect_available().return_const(0usize);
        mock.expect_txspace().return_const(0usize);
        mock.expect_write().never();

        let mut decoder = EcuDecoder::new();
        assert_eq!(decoder.poll(&mut mock), None);
    }

    #[test]
    fn test_poll_stops_when_link_runs_dry() {
        // Link over-reports what it holds
        let mut mock = MockByteSource::new();
        mock.expect_available().return_const(120usize);
        let mut remaining = 5;
        mock.expect_read().returning(move || {
            if remaining == 0 {
                None
            } else {
                remaining -= 1;
                Some(0)
            }
        });
        mock.expect_txspace().return_const(16usize);
        mock.expect_write().times(3).return_const(());

        let mut decoder = EcuDecoder::new();
        assert_eq!(decoder.poll(&mut mock), None);
        assert!(!decoder.healthy());
    }
}
