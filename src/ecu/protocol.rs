//! # ECU Protocol Constants and Types
//!
//! Realtime data block returned by the ECU in answer to the `'a' 0x00 0x06`
//! read command. The block is unframed: the reply is simply the first 112
//! bytes of the ECU's realtime table, every multi-byte field big-endian.
//!
//! Field offsets follow the ECU's data table. Offset 67 is padding and
//! offsets 110-111 are reserved, so a block carries usable data as soon as
//! 110 bytes have arrived.

/// Full size of the realtime data block
pub const ECU_FRAME_SIZE: usize = 112;

/// Bytes needed to cover every field of the block
pub const ECU_MIN_VALID_BYTES: usize = 110;

/// Read realtime data command byte (`'a'`)
pub const ECU_CMD_READ_DATA: u8 = b'a';

/// Complete command requesting the next realtime data block
pub const ECU_POLL_COMMAND: [u8; 3] = [ECU_CMD_READ_DATA, 0x00, 0x06];

/// Field offsets into the realtime data block
pub mod offsets {
    pub const SECONDS: usize = 0;
    pub const PULSE_WIDTH_1: usize = 2;
    pub const PULSE_WIDTH_2: usize = 4;
    pub const RPM: usize = 6;
    pub const ADVANCE: usize = 8;
    pub const SQUIRT: usize = 10;
    pub const ENGINE: usize = 11;
    pub const AFR_TARGET_1: usize = 12;
    pub const AFR_TARGET_2: usize = 13;
    pub const WBO2_EN_1: usize = 14;
    pub const WBO2_EN_2: usize = 15;
    pub const BAROMETER: usize = 16;
    pub const MAP: usize = 18;
    pub const MAT: usize = 20;
    pub const COOLANT: usize = 22;
    pub const TPS: usize = 24;
    pub const BATTERY_VOLTAGE: usize = 26;
    pub const AFR_1: usize = 28;
    pub const AFR_2: usize = 30;
    pub const KNOCK: usize = 32;
    pub const EGO_COR_1: usize = 34;
    pub const EGO_COR_2: usize = 36;
    pub const AIR_COR: usize = 38;
    pub const WARM_COR: usize = 40;
    pub const ACCEL_ENRICH: usize = 42;
    pub const TPS_FUEL_CUT: usize = 44;
    pub const BARO_CORRECTION: usize = 46;
    pub const GAMMA_ENRICH: usize = 48;
    pub const VE_1: usize = 50;
    pub const VE_2: usize = 52;
    pub const IAC_STEP: usize = 54;
    pub const COLD_ADV_DEG: usize = 56;
    pub const TPS_DOT: usize = 58;
    pub const MAP_DOT: usize = 60;
    pub const DWELL: usize = 62;
    pub const MAF: usize = 64;
    pub const FUEL_LOAD: usize = 66;
    pub const FUEL_COR: usize = 68;
    pub const PORT_STATUS: usize = 70;
    pub const KNOCK_RETARD: usize = 71;
    pub const EAE_FUEL_COR_1: usize = 72;
    pub const EGO_V_1: usize = 74;
    pub const EGO_V_2: usize = 76;
    pub const STATUS_1: usize = 78;
    pub const STATUS_2: usize = 79;
    pub const STATUS_3: usize = 80;
    pub const STATUS_4: usize = 81;
    pub const LOOP_TIME: usize = 82;
    pub const STATUS_5: usize = 84;
    pub const TPS_ADC: usize = 86;
    pub const FUEL_LOAD_2: usize = 88;
    pub const IGN_LOAD: usize = 90;
    pub const IGN_LOAD_2: usize = 92;
    pub const SYNC_COUNT: usize = 94;
    pub const TIMING_ERR: usize = 95;
    pub const DELTA: usize = 96;
    pub const WALL_FUEL_1: usize = 100;
    pub const GPIO_ADC_0: usize = 104;
    pub const GPIO_ADC_1: usize = 106;
    pub const GPIO_ADC_2: usize = 108;
}

/// One decoded realtime data block
///
/// Values are kept as the raw integers sent by the ECU. Most signed 16-bit
/// fields are tenths of their unit; the accessors below convert the ones the
/// rest of the crate reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EcuTelemetrySample {
    /// Seconds the ECU has been powered
    pub seconds: u16,
    /// Main injector 1 pulse width, microseconds
    pub pulse_width_1: u16,
    /// Main injector 2 pulse width, microseconds
    pub pulse_width_2: u16,
    /// Engine speed in RPM
    pub rpm: u16,
    /// Final ignition advance, 0.1 deg BTDC
    pub advance: i16,
    pub squirt: u8,
    pub engine: u8,
    pub afr_target_1: u8,
    pub afr_target_2: u8,
    pub wbo2_en_1: u8,
    pub wbo2_en_2: u8,
    /// Barometric pressure, 0.1 kPa
    pub barometer: i16,
    /// Manifold air pressure, 0.1 kPa
    pub map: i16,
    /// Manifold air temperature, 0.1 deg F
    pub mat: i16,
    /// Coolant temperature, 0.1 deg F
    pub coolant: i16,
    /// Throttle position, 0.1 %
    pub tps: i16,
    /// Battery voltage, 0.1 V
    pub battery_voltage: i16,
    pub afr_1: i16,
    pub afr_2: i16,
    pub knock: i16,
    pub ego_cor_1: i16,
    pub ego_cor_2: i16,
    pub air_cor: i16,
    pub warm_cor: i16,
    pub accel_enrich: i16,
    pub tps_fuel_cut: i16,
    pub baro_correction: i16,
    pub gamma_enrich: i16,
    pub ve_1: i16,
    pub ve_2: i16,
    pub iac_step: i16,
    pub cold_adv_deg: i16,
    pub tps_dot: i16,
    pub map_dot: i16,
    pub dwell: i16,
    pub maf: i16,
    pub fuel_load: u8,
    pub fuel_cor: i16,
    pub port_status: u8,
    pub knock_retard: u8,
    pub eae_fuel_cor_1: i16,
    pub ego_v_1: i16,
    pub ego_v_2: i16,
    pub status_1: u8,
    pub status_2: u8,
    pub status_3: u8,
    pub status_4: u8,
    pub loop_time: u16,
    pub status_5: u16,
    pub tps_adc: u16,
    pub fuel_load_2: i16,
    pub ign_load: i16,
    pub ign_load_2: i16,
    /// Crank sync loss count
    pub sync_count: u8,
    pub timing_err: i8,
    /// Time between crank triggers
    pub delta: i32,
    pub wall_fuel_1: u32,
    pub gpio_adc_0: u16,
    pub gpio_adc_1: u16,
    pub gpio_adc_2: u16,
}

impl EcuTelemetrySample {
    /// Coolant temperature in degrees Fahrenheit
    pub fn coolant_deg_f(&self) -> f32 {
        self.coolant as f32 / 10.0
    }

    /// Barometric pressure in kPa
    pub fn barometer_kpa(&self) -> f32 {
        self.barometer as f32 / 10.0
    }

    /// Throttle position in percent
    pub fn throttle_percent(&self) -> f32 {
        self.tps as f32 / 10.0
    }

    /// Battery voltage in volts
    pub fn battery_volts(&self) -> f32 {
        self.battery_voltage as f32 / 10.0
    }

    /// Serialize into the big-endian block layout the ECU sends
    ///
    /// Padding and reserved bytes are zero.
    pub fn to_bytes(&self) -> [u8; ECU_FRAME_SIZE] {
        use offsets::*;

        let mut b = [0u8; ECU_FRAME_SIZE];
        put(&mut b, SECONDS, &self.seconds.to_be_bytes());
        put(&mut b, PULSE_WIDTH_1, &self.pulse_width_1.to_be_bytes());
        put(&mut b, PULSE_WIDTH_2, &self.pulse_width_2.to_be_bytes());
        put(&mut b, RPM, &self.rpm.to_be_bytes());
        put(&mut b, ADVANCE, &self.advance.to_be_bytes());
        b[SQUIRT] = self.squirt;
        b[ENGINE] = self.engine;
        b[AFR_TARGET_1] = self.afr_target_1;
        b[AFR_TARGET_2] = self.afr_target_2;
        b[WBO2_EN_1] = self.wbo2_en_1;
        b[WBO2_EN_2] = self.wbo2_en_2;
        put(&mut b, BAROMETER, &self.barometer.to_be_bytes());
        put(&mut b, MAP, &self.map.to_be_bytes());
        put(&mut b, MAT, &self.mat.to_be_bytes());
        put(&mut b, COOLANT, &self.coolant.to_be_bytes());
        put(&mut b, TPS, &self.tps.to_be_bytes());
        put(&mut b, BATTERY_VOLTAGE, &self.battery_voltage.to_be_bytes());
        put(&mut b, AFR_1, &self.afr_1.to_be_bytes());
        put(&mut b, AFR_2, &self.afr_2.to_be_bytes());
        put(&mut b, KNOCK, &self.knock.to_be_bytes());
        put(&mut b, EGO_COR_1, &self.ego_cor_1.to_be_bytes());
        put(&mut b, EGO_COR_2, &self.ego_cor_2.to_be_bytes());
        put(&mut b, AIR_COR, &self.air_cor.to_be_bytes());
        put(&mut b, WARM_COR, &self.warm_cor.to_be_bytes());
        put(&mut b, ACCEL_ENRICH, &self.accel_enrich.to_be_bytes());
        put(&mut b, TPS_FUEL_CUT, &self.tps_fuel_cut.to_be_bytes());
        put(&mut b, BARO_CORRECTION, &self.baro_correction.to_be_bytes());
        put(&mut b, GAMMA_ENRICH, &self.gamma_enrich.to_be_bytes());
        put(&mut b, VE_1, &self.ve_1.to_be_bytes());
        put(&mut b, VE_2, &self.ve_2.to_be_bytes());
        put(&mut b, IAC_STEP, &self.iac_step.to_be_bytes());
        put(&mut b, COLD_ADV_DEG, &self.cold_adv_deg.to_be_bytes());
        put(&mut b, TPS_DOT, &self.tps_dot.to_be_bytes());
        put(&mut b, MAP_DOT, &self.map_dot.to_be_bytes());
        put(&mut b, DWELL, &self.dwell.to_be_bytes());
        put(&mut b, MAF, &self.maf.to_be_bytes());
        b[FUEL_LOAD] = self.fuel_load;
        put(&mut b, FUEL_COR, &self.fuel_cor.to_be_bytes());
        b[PORT_STATUS] = self.port_status;
        b[KNOCK_RETARD] = self.knock_retard;
        put(&mut b, EAE_FUEL_COR_1, &self.eae_fuel_cor_1.to_be_bytes());
        put(&mut b, EGO_V_1, &self.ego_v_1.to_be_bytes());
        put(&mut b, EGO_V_2, &self.ego_v_2.to_be_bytes());
        b[STATUS_1] = self.status_1;
        b[STATUS_2] = self.status_2;
        b[STATUS_3] = self.status_3;
        b[STATUS_4] = self.status_4;
        put(&mut b, LOOP_TIME, &self.loop_time.to_be_bytes());
        put(&mut b, STATUS_5, &self.status_5.to_be_bytes());
        put(&mut b, TPS_ADC, &self.tps_adc.to_be_bytes());
        put(&mut b, FUEL_LOAD_2, &self.fuel_load_2.to_be_bytes());
        put(&mut b, IGN_LOAD, &self.ign_load.to_be_bytes());
        put(&mut b, IGN_LOAD_2, &self.ign_load_2.to_be_bytes());
        b[SYNC_COUNT] = self.sync_count;
        b[TIMING_ERR] = self.timing_err as u8;
        put(&mut b, DELTA, &self.delta.to_be_bytes());
        put(&mut b, WALL_FUEL_1, &self.wall_fuel_1.to_be_bytes());
        put(&mut b, GPIO_ADC_0, &self.gpio_adc_0.to_be_bytes());
        put(&mut b, GPIO_ADC_1, &self.gpio_adc_1.to_be_bytes());
        put(&mut b, GPIO_ADC_2, &self.gpio_adc_2.to_be_bytes());
        b
    }
}

fn put(buf: &mut [u8], offset: usize, bytes: &[u8]) {
    buf[offset..offset + bytes.len()].copy_from_slice(bytes);
}
