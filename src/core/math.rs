//! Rotation math for mount-angle estimation.
//!
//! Euler angles follow the vehicle convention: roll about x (forward),
//! pitch about y (left), yaw about z (up), applied in ZYX order. All
//! angles are radians, all values f64.

/// Row-major 3x3 rotation matrix.
pub type Mat3 = [[f64; 3]; 3];

/// Build a rotation matrix from [roll, pitch, yaw] (ZYX order).
pub fn rot_from_euler(rpy: [f64; 3]) -> Mat3 {
    let (sr, cr) = (rpy[0].sin(), rpy[0].cos());
    let (sp, cp) = (rpy[1].sin(), rpy[1].cos());
    let (sy, cy) = (rpy[2].sin(), rpy[2].cos());

    [
        [cp * cy, sr * sp * cy - cr * sy, cr * sp * cy + sr * sy],
        [cp * sy, sr * sp * sy + cr * cy, cr * sp * sy - sr * cy],
        [-sp, sr * cp, cr * cp],
    ]
}

/// Recover [roll, pitch, yaw] from a rotation matrix (ZYX order).
///
/// Pitch is clamped into the asin domain so that matrices perturbed by
/// round-off cannot produce NaN.
pub fn euler_from_rot(rot: &Mat3) -> [f64; 3] {
    [
        rot[2][1].atan2(rot[2][2]),
        (-rot[2][0]).clamp(-1.0, 1.0).asin(),
        rot[1][0].atan2(rot[0][0]),
    ]
}

/// Matrix product `a * b`.
pub fn mat3_mul(a: &Mat3, b: &Mat3) -> Mat3 {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
    out
}

/// Compose two Euler rotations: result = a ⊕ b in matrix form.
pub fn compose_euler(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    euler_from_rot(&mat3_mul(&rot_from_euler(a), &rot_from_euler(b)))
}
