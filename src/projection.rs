use nalgebra::{Matrix4, Quaternion, UnitQuaternion, Vector3};

/// Camera-to-world transform of a located pose: translation * rotation. Invert it to get a
/// world-to-camera view matrix.
// Ported from:
// https://gitlab.freedesktop.org/monado/demos/xrgears/-/blob/master/src/main.cpp
pub fn view_from_pose(pose: &xr::Posef) -> Matrix4<f32> {
    let quat = pose.orientation;
    let quat = Quaternion::new(quat.w, quat.x, quat.y, quat.z);
    // Runtimes hand back nearly-unit quaternions; renormalize instead of trusting them
    let rotation = UnitQuaternion::from_quaternion(quat).to_homogeneous();

    let position = pose.position;
    let position = Vector3::new(position.x, position.y, position.z);
    let translation = Matrix4::new_translation(&position);

    translation * rotation
}

/// OpenGL projection matrix (clip depth -1..1) for an asymmetric frustum, given as the four angles
/// of the view's field of view.
pub fn projection_from_fov(fov: &xr::Fovf, near: f32, far: f32) -> Matrix4<f32> {
    let tan_left = fov.angle_left.tan();
    let tan_right = fov.angle_right.tan();

    let tan_up = fov.angle_up.tan();
    let tan_down = fov.angle_down.tan();

    let tan_width = tan_right - tan_left;
    let tan_height = tan_up - tan_down;

    let a11 = 2.0 / tan_width;
    let a22 = 2.0 / tan_height;

    let a31 = (tan_right + tan_left) / tan_width;
    let a32 = (tan_up + tan_down) / tan_height;
    let a33 = -(far + near) / (far - near);

    let a43 = -(2.0 * far * near) / (far - near);
    Matrix4::new(
        a11, 0.0, a31, 0.0, //
        0.0, a22, a32, 0.0, //
        0.0, 0.0, a33, a43, //
        0.0, 0.0, -1.0, 0.0, //
    )
}
