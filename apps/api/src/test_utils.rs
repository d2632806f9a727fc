//! テスト用のエンティティ生成ヘルパー

use chrono::{DateTime, Utc};
use devcamper_domain::{
    bootcamp::{
        Address,
        Bootcamp,
        BootcampId,
        BootcampName,
        Career,
        Careers,
        Description,
        NewBootcamp,
    },
    clock::FixedClock,
    course::{
        Course,
        CourseDescription,
        CourseTitle,
        MinimumSkill,
        NewCourse,
        Tuition,
        Weeks,
    },
    geo::{GeoPoint, Location},
    ownership::Requester,
    review::{NewReview, Rating, Review, ReviewText, ReviewTitle},
    user::{Email, NewUser, User, UserId, UserName, UserRole},
};
use devcamper_infra::mock::MockPasswordHasher;

pub(crate) fn fixed_now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

pub(crate) fn fixed_clock() -> FixedClock {
    FixedClock::new(fixed_now())
}

pub(crate) fn requester(role: UserRole) -> Requester {
    Requester::new(UserId::new(), role)
}

/// パスワードは `MockPasswordHasher` でハッシュ化した `password`
pub(crate) fn create_user(role: UserRole, email: &str) -> User {
    User::new(NewUser {
        name: UserName::new("John Doe").unwrap(),
        email: Email::new(email).unwrap(),
        role,
        password_hash: MockPasswordHasher::hash_of("password"),
        now: fixed_now(),
    })
}

pub(crate) fn location(latitude: f64, longitude: f64) -> Location {
    Location {
        point:             GeoPoint::new(latitude, longitude).unwrap(),
        formatted_address: format!("{latitude}, {longitude}"),
        street:            None,
        city:              None,
        state:             None,
        zipcode:           None,
        country:           Some("US".to_string()),
    }
}

pub(crate) fn boston_location() -> Location {
    Location {
        point:             GeoPoint::new(42.350_876, -71.106_19).unwrap(),
        formatted_address: "233 Bay State Rd, Boston, MA 02215-1405, US".to_string(),
        street:            Some("233 Bay State Rd".to_string()),
        city:              Some("Boston".to_string()),
        state:             Some("MA".to_string()),
        zipcode:           Some("02215-1405".to_string()),
        country:           Some("US".to_string()),
    }
}

pub(crate) fn create_bootcamp(owner: &UserId, name: &str) -> Bootcamp {
    Bootcamp::new(NewBootcamp {
        user_id:        owner.clone(),
        name:           BootcampName::new(name).unwrap(),
        description:    Description::new("Full stack web development").unwrap(),
        website:        None,
        phone:          None,
        email:          None,
        address:        Address::new("233 Bay State Rd Boston MA 02215").unwrap(),
        location:       None,
        careers:        Careers::new([Career::WebDevelopment]).unwrap(),
        housing:        false,
        job_assistance: false,
        job_guarantee:  false,
        accept_gi:      false,
        now:            fixed_now(),
    })
}

pub(crate) fn create_course(bootcamp_id: &BootcampId, owner: &UserId, tuition: i32) -> Course {
    Course::new(NewCourse {
        bootcamp_id:           bootcamp_id.clone(),
        user_id:               owner.clone(),
        title:                 CourseTitle::new("Front End Web Development").unwrap(),
        description:           CourseDescription::new("HTML, CSS and JavaScript").unwrap(),
        weeks:                 Weeks::new(8).unwrap(),
        tuition:               Tuition::new(tuition).unwrap(),
        minimum_skill:         MinimumSkill::Beginner,
        scholarship_available: false,
        now:                   fixed_now(),
    })
}

pub(crate) fn create_review(bootcamp_id: &BootcampId, author: &UserId, rating: i32) -> Review {
    Review::new(NewReview {
        bootcamp_id: bootcamp_id.clone(),
        user_id:     author.clone(),
        title:       ReviewTitle::new("Learned a ton").unwrap(),
        text:        ReviewText::new("Great instructors").unwrap(),
        rating:      Rating::new(rating).unwrap(),
        now:         fixed_now(),
    })
}
