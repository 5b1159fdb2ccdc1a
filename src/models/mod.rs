mod setting;
mod traffic;
mod user;

pub use setting::{Setting, UpdateSettingRequest};
pub use traffic::{NewPageView, NewSession, NewVisitor};
pub use user::{
    AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest, Role, UpdateProfileRequest,
    UpdateRoleRequest, User, UserSummary,
};
