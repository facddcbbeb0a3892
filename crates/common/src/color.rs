//! ITU-T H.273 color description types and HDR classification.

use serde::{Deserialize, Serialize};

/// Matrix coefficients (ITU-T H.273 § 8.3).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatrixCoefficients {
    /// Identity (RGB).
    Rgb,
    Bt709,
    Fcc,
    Bt470Bg,
    /// SMPTE 170M / BT.601-6 525.
    Bt601,
    Smpte240M,
    YCgCo,
    /// BT.2020 non-constant luminance.
    Bt2020Ncl,
    /// BT.2020 constant luminance.
    Bt2020Cl,
    /// SMPTE ST 2085 (Y'D'zD'x).
    Smpte2085,
    ChromaDerivedNcl,
    ChromaDerivedCl,
    ICtCp,
    Unspecified,
}

impl MatrixCoefficients {
    /// Map a numeric H.273 tag. Unrecognized values map to `None`.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Rgb),
            1 => Some(Self::Bt709),
            2 => Some(Self::Unspecified),
            4 => Some(Self::Fcc),
            5 => Some(Self::Bt470Bg),
            6 => Some(Self::Bt601),
            7 => Some(Self::Smpte240M),
            8 => Some(Self::YCgCo),
            9 => Some(Self::Bt2020Ncl),
            10 => Some(Self::Bt2020Cl),
            11 => Some(Self::Smpte2085),
            12 => Some(Self::ChromaDerivedNcl),
            13 => Some(Self::ChromaDerivedCl),
            14 => Some(Self::ICtCp),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rgb => "rgb",
            Self::Bt709 => "bt709",
            Self::Fcc => "fcc",
            Self::Bt470Bg => "bt470bg",
            Self::Bt601 => "bt601",
            Self::Smpte240M => "smpte240m",
            Self::YCgCo => "ycgco",
            Self::Bt2020Ncl => "bt2020nc",
            Self::Bt2020Cl => "bt2020c",
            Self::Smpte2085 => "smpte2085",
            Self::ChromaDerivedNcl => "chroma-derived-nc",
            Self::ChromaDerivedCl => "chroma-derived-c",
            Self::ICtCp => "ictcp",
            Self::Unspecified => "unspecified",
        }
    }
}

/// Transfer characteristics (ITU-T H.273 § 8.2).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferCharacteristics {
    Bt709,
    Gamma22,
    Gamma28,
    /// SMPTE 170M / BT.601.
    Bt601,
    Smpte240M,
    Linear,
    Log100,
    Log316,
    /// IEC 61966-2-4 (xvYCC).
    Xvycc,
    Bt1361,
    /// IEC 61966-2-1 (sRGB).
    Srgb,
    Bt2020Ten,
    Bt2020Twelve,
    /// SMPTE ST 2084 (PQ).
    Smpte2084,
    Smpte428,
    /// ARIB STD-B67 / Hybrid Log-Gamma.
    Hlg,
    Unspecified,
}

impl TransferCharacteristics {
    /// Map a numeric H.273 tag. Unrecognized values map to `None`.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Bt709),
            6 => Some(Self::Bt601),
            2 => Some(Self::Unspecified),
            4 => Some(Self::Gamma22),
            5 => Some(Self::Gamma28),
            7 => Some(Self::Smpte240M),
            8 => Some(Self::Linear),
            9 => Some(Self::Log100),
            10 => Some(Self::Log316),
            11 => Some(Self::Xvycc),
            12 => Some(Self::Bt1361),
            13 => Some(Self::Srgb),
            14 => Some(Self::Bt2020Ten),
            15 => Some(Self::Bt2020Twelve),
            16 => Some(Self::Smpte2084),
            17 => Some(Self::Smpte428),
            18 => Some(Self::Hlg),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bt709 => "bt709",
            Self::Gamma22 => "gamma22",
            Self::Gamma28 => "gamma28",
            Self::Bt601 => "bt601",
            Self::Smpte240M => "smpte240m",
            Self::Linear => "linear",
            Self::Log100 => "log100",
            Self::Log316 => "log316",
            Self::Xvycc => "iec61966-2-4",
            Self::Bt1361 => "bt1361",
            Self::Srgb => "srgb",
            Self::Bt2020Ten => "bt2020-10",
            Self::Bt2020Twelve => "bt2020-12",
            Self::Smpte2084 => "smpte2084",
            Self::Smpte428 => "smpte428",
            Self::Hlg => "arib-std-b67",
            Self::Unspecified => "unspecified",
        }
    }
}

/// Color primaries (ITU-T H.273 § 8.1).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorPrimaries {
    Bt709,
    Bt470M,
    Bt470Bg,
    /// SMPTE 170M / BT.601-6 525.
    Bt601,
    Smpte240M,
    Film,
    Bt2020,
    /// SMPTE ST 428-1 (XYZ).
    Smpte428,
    /// SMPTE RP 431-2 (DCI-P3).
    Smpte431,
    /// SMPTE EG 432-1 (Display P3).
    Smpte432,
    /// EBU Tech 3213 / JEDEC P22 phosphors.
    Ebu3213,
    Unspecified,
}

impl ColorPrimaries {
    /// Map a numeric H.273 tag. Unrecognized values map to `None`.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Bt709),
            2 => Some(Self::Unspecified),
            4 => Some(Self::Bt470M),
            5 => Some(Self::Bt470Bg),
            6 => Some(Self::Bt601),
            7 => Some(Self::Smpte240M),
            8 => Some(Self::Film),
            9 => Some(Self::Bt2020),
            10 => Some(Self::Smpte428),
            11 => Some(Self::Smpte431),
            12 => Some(Self::Smpte432),
            22 => Some(Self::Ebu3213),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bt709 => "bt709",
            Self::Bt470M => "bt470m",
            Self::Bt470Bg => "bt470bg",
            Self::Bt601 => "bt601",
            Self::Smpte240M => "smpte240m",
            Self::Film => "film",
            Self::Bt2020 => "bt2020",
            Self::Smpte428 => "smpte428",
            Self::Smpte431 => "smpte431",
            Self::Smpte432 => "smpte432",
            Self::Ebu3213 => "ebu3213",
            Self::Unspecified => "unspecified",
        }
    }
}

/// Normalized color description of a video track.
///
/// Each field is independently optional; a parser that cannot recover a
/// field leaves it absent rather than guessing.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoColorInfo {
    pub matrix_coefficients: Option<MatrixCoefficients>,
    pub transfer_characteristics: Option<TransferCharacteristics>,
    pub primaries: Option<ColorPrimaries>,
    pub full_range: Option<bool>,
}

impl VideoColorInfo {
    /// HDR10 signaling: BT.2020 primaries, PQ transfer, BT.2020 matrix.
    pub fn hdr10() -> Self {
        Self {
            matrix_coefficients: Some(MatrixCoefficients::Bt2020Ncl),
            transfer_characteristics: Some(TransferCharacteristics::Smpte2084),
            primaries: Some(ColorPrimaries::Bt2020),
            full_range: Some(false),
        }
    }

    /// Standard-dynamic-range BT.709 signaling.
    pub fn bt709() -> Self {
        Self {
            matrix_coefficients: Some(MatrixCoefficients::Bt709),
            transfer_characteristics: Some(TransferCharacteristics::Bt709),
            primaries: Some(ColorPrimaries::Bt709),
            full_range: Some(false),
        }
    }

    /// Standard-dynamic-range BT.601 signaling.
    pub fn bt601() -> Self {
        Self {
            matrix_coefficients: Some(MatrixCoefficients::Bt601),
            transfer_characteristics: Some(TransferCharacteristics::Bt601),
            primaries: Some(ColorPrimaries::Bt601),
            full_range: Some(false),
        }
    }

    /// Dolby Vision signaling: ICtCp matrix with PQ transfer.
    pub fn dolby_vision() -> Self {
        Self {
            matrix_coefficients: Some(MatrixCoefficients::ICtCp),
            transfer_characteristics: Some(TransferCharacteristics::Smpte2084),
            primaries: Some(ColorPrimaries::Bt2020),
            full_range: Some(false),
        }
    }

    /// True when no field carries a value.
    pub fn is_empty(&self) -> bool {
        self.matrix_coefficients.is_none()
            && self.transfer_characteristics.is_none()
            && self.primaries.is_none()
            && self.full_range.is_none()
    }

    /// Whether the combination signals HDR content.
    ///
    /// True only for HDR10 (BT.2020 + PQ + a BT.2020/ICtCp matrix), HLG
    /// (BT.2020 + ARIB STD-B67), or Dolby Vision (PQ + ICtCp). Missing
    /// fields never produce true.
    pub fn is_hdr(&self) -> bool {
        let hdr10 = self.primaries == Some(ColorPrimaries::Bt2020)
            && self.transfer_characteristics == Some(TransferCharacteristics::Smpte2084)
            && matches!(
                self.matrix_coefficients,
                Some(MatrixCoefficients::Bt2020Ncl)
                    | Some(MatrixCoefficients::Bt2020Cl)
                    | Some(MatrixCoefficients::ICtCp)
            );

        let hlg = self.primaries == Some(ColorPrimaries::Bt2020)
            && self.transfer_characteristics == Some(TransferCharacteristics::Hlg);

        let dolby_vision = self.transfer_characteristics
            == Some(TransferCharacteristics::Smpte2084)
            && self.matrix_coefficients == Some(MatrixCoefficients::ICtCp);

        hdr10 || hlg || dolby_vision
    }
}
